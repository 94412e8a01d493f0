use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde_json::{json, Value};

use weave_types::{Evidence, Evidences, Link, LinkHash, Segment};

use crate::error::{HttpError, HttpResult};
use crate::params::{parse_map_filter, parse_segment_filter};
use crate::router::AppState;

pub async fn root(State(state): State<AppState>) -> HttpResult<Json<Value>> {
    let info = state.adapter.get_info()?;
    Ok(Json(json!({ "adapter": info })))
}

pub async fn create_segment(
    State(state): State<AppState>,
    payload: Result<Json<Link>, JsonRejection>,
) -> HttpResult<Json<Segment>> {
    let Json(link) = payload.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    link.validate()
        .map_err(|e| HttpError::BadRequest(e.to_string()))?;

    let link_hash = state.adapter.create_link(&link)?;
    let segment = state
        .adapter
        .get_segment(&link_hash)?
        .ok_or_else(|| HttpError::Internal("created segment not readable".into()))?;
    Ok(Json(segment))
}

pub async fn get_segment(
    State(state): State<AppState>,
    Path(link_hash): Path<String>,
) -> HttpResult<Json<Segment>> {
    let link_hash = parse_hash(&link_hash)?;
    match state.adapter.get_segment(&link_hash)? {
        Some(segment) => Ok(Json(segment)),
        None => Err(HttpError::NotFound),
    }
}

pub async fn find_segments(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> HttpResult<Json<Vec<Segment>>> {
    let filter = parse_segment_filter(&params)?;
    Ok(Json(state.adapter.find_segments(&filter)?))
}

pub async fn get_map_ids(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> HttpResult<Json<Vec<String>>> {
    let filter = parse_map_filter(&params)?;
    Ok(Json(state.adapter.get_map_ids(&filter)?))
}

pub async fn get_evidences(
    State(state): State<AppState>,
    Path(link_hash): Path<String>,
) -> HttpResult<Json<Evidences>> {
    let link_hash = parse_hash(&link_hash)?;
    // Evidence lists are total: an unknown hash has an empty list.
    let evidences = state.adapter.get_evidences(&link_hash)?.unwrap_or_default();
    Ok(Json(evidences))
}

pub async fn add_evidence(
    State(state): State<AppState>,
    Path(link_hash): Path<String>,
    payload: Result<Json<Evidence>, JsonRejection>,
) -> HttpResult<Json<Evidence>> {
    let link_hash = parse_hash(&link_hash)?;
    let Json(evidence) = payload.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    state.adapter.add_evidence(&link_hash, &evidence)?;
    Ok(Json(evidence))
}

fn parse_hash(raw: &str) -> HttpResult<LinkHash> {
    LinkHash::from_hex(raw).map_err(|_| HttpError::BadRequest("invalid link hash".into()))
}
