//! Query-parameter parsing.
//!
//! Unknown parameters are ignored. `tags` is an AND-separated list: the
//! wire form is `tags=a+b`, which URL decoding turns into whitespace.
//! `linkHashes` is comma-separated. A present-but-empty `prevLinkHash`
//! selects root links.

use std::collections::HashMap;

use weave_store::{MapFilter, Pagination, SegmentFilter};

use crate::error::HttpError;

/// Page size applied when the request carries no `limit` parameter.
pub const DEFAULT_LIMIT: usize = 20;

pub fn parse_pagination(params: &HashMap<String, String>) -> Result<Pagination, HttpError> {
    let offset = match params.get("offset") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| HttpError::BadRequest("invalid offset".into()))?,
        None => 0,
    };
    let limit = match params.get("limit") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| HttpError::BadRequest("invalid limit".into()))?,
        None => DEFAULT_LIMIT,
    };
    Ok(Pagination::new(offset, limit))
}

pub fn parse_segment_filter(
    params: &HashMap<String, String>,
) -> Result<SegmentFilter, HttpError> {
    let pagination = parse_pagination(params)?;

    let map_ids = params
        .get("mapId")
        .filter(|v| !v.is_empty())
        .map(|v| vec![v.clone()])
        .unwrap_or_default();
    let process = params.get("process").filter(|v| !v.is_empty()).cloned();
    let prev_link_hash = params.get("prevLinkHash").cloned();
    let tags = params
        .get("tags")
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let link_hashes = params
        .get("linkHashes")
        .map(|v| {
            v.split(',')
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(SegmentFilter {
        map_ids,
        process,
        prev_link_hash,
        tags,
        link_hashes,
        pagination,
    })
}

pub fn parse_map_filter(params: &HashMap<String, String>) -> Result<MapFilter, HttpError> {
    Ok(MapFilter {
        process: params.get("process").filter(|v| !v.is_empty()).cloned(),
        pagination: parse_pagination(params)?,
    })
}
