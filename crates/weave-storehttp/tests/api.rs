//! Endpoint tests over the in-memory store (and a failing mock for the
//! 500 paths).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use weave_memorystore::MemoryStore;
use weave_store::{StoreReader, StoreWriter};
use weave_storehttp::build_router;
use weave_storetesting::fixtures::{child_link, root_link, TestLinkBuilder};
use weave_storetesting::MockAdapter;
use weave_types::{Evidence, Link, Segment};

fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    (build_router(store.clone()), store)
}

fn failing_app() -> (Router, Arc<MockAdapter>) {
    let mock = Arc::new(MockAdapter::failing());
    (build_router(mock.clone()), mock)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_reports_adapter_info() {
    let (app, _) = app();
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["adapter"]["name"], json!("memory"));
}

#[tokio::test]
async fn root_maps_backend_failure_to_500() {
    let (app, mock) = failing_app();
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("internal server error"));
    assert_eq!(body["status"], json!(500));
    assert_eq!(mock.call_counts().get_info, 1);
}

// ---------------------------------------------------------------------------
// POST /segments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_segment_returns_the_segment() {
    let (app, store) = app();
    let link = root_link("m1", "p1");
    let (status, body) = post(&app, "/segments", &serde_json::to_value(&link).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let segment: Segment = serde_json::from_value(body).unwrap();
    assert_eq!(segment.link, link);
    assert_eq!(segment.meta.link_hash, link.hash().unwrap());
    assert!(store.get_segment(&segment.meta.link_hash).unwrap().is_some());
}

#[tokio::test]
async fn create_segment_rejects_invalid_links() {
    let (app, store) = app();
    let (status, body) = post(
        &app,
        "/segments",
        &json!({"state": {}, "meta": {"mapId": "m1", "process": ""}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("meta.process should be a non empty string"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn create_segment_rejects_bad_refs_with_interop_message() {
    let (app, _) = app();
    let (status, body) = post(
        &app,
        "/segments",
        &json!({
            "state": {},
            "meta": {"mapId": "m1", "process": "p", "refs": [{"process": "wrong"}]}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("missing segment or (process and linkHash)"));
}

#[tokio::test]
async fn create_segment_rejects_non_json_bodies() {
    let (app, _) = app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/segments")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("1234567890azertyui"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_segment_maps_backend_failure_to_500() {
    let (app, _) = failing_app();
    let link = root_link("m1", "p1");
    let (status, body) = post(&app, "/segments", &serde_json::to_value(&link).unwrap()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("internal server error"));
}

// ---------------------------------------------------------------------------
// GET /segments/{hash}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_segment_roundtrip() {
    let (app, store) = app();
    let link_hash = store.create_link(&root_link("m1", "p1")).unwrap();

    let (status, body) = get(&app, &format!("/segments/{}", link_hash.to_hex())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["linkHash"], json!(link_hash.to_hex()));
}

#[tokio::test]
async fn get_segment_unknown_hash_is_404() {
    let (app, _) = app();
    let (status, body) = get(&app, &format!("/segments/{}", "ab".repeat(32))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Not Found"));
}

#[tokio::test]
async fn get_segment_malformed_hash_is_400() {
    let (app, _) = app();
    let (status, body) = get(&app, "/segments/not-a-hash").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid link hash"));
}

// ---------------------------------------------------------------------------
// GET /segments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn find_segments_applies_query_filters() {
    let (app, store) = app();
    store
        .create_link(
            &TestLinkBuilder::new("m1", "p")
                .with_tags(["one", "two"])
                .build(),
        )
        .unwrap();
    store
        .create_link(&TestLinkBuilder::new("m1", "p").with_tags(["one"]).build())
        .unwrap();
    store.create_link(&root_link("m2", "p")).unwrap();

    // `tags=one+two` URL-decodes to whitespace-separated AND terms.
    let (status, body) = get(&app, "/segments?mapId=m1&tags=one+two&offset=0&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let segments = body.as_array().unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0]["link"]["meta"]["mapId"], json!("m1"));
}

#[tokio::test]
async fn find_segments_by_prev_link_hash() {
    let (app, store) = app();
    let parent = store.create_link(&root_link("m1", "p")).unwrap();
    store.create_link(&child_link(&parent, "m1", "p")).unwrap();

    // Empty prevLinkHash selects roots.
    let (status, body) = get(&app, "/segments?prevLinkHash=&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["meta"]["linkHash"], json!(parent.to_hex()));

    // A parent hash selects its children.
    let (status, body) =
        get(&app, &format!("/segments?prevLinkHash={}&limit=10", parent.to_hex())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn find_segments_by_link_hashes_csv() {
    let (app, store) = app();
    let h1 = store.create_link(&root_link("m1", "p")).unwrap();
    store.create_link(&root_link("m2", "p")).unwrap();
    let h3 = store.create_link(&root_link("m3", "p")).unwrap();

    let uri = format!("/segments?linkHashes={},{}&limit=10", h1.to_hex(), h3.to_hex());
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn find_segments_rejects_bad_pagination() {
    let (app, _) = app();

    let (status, body) = get(&app, "/segments?offset=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid offset"));

    let (status, body) = get(&app, "/segments?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid limit"));
}

#[tokio::test]
async fn find_segments_ignores_unknown_parameters() {
    let (app, store) = app();
    store.create_link(&root_link("m1", "p")).unwrap();
    let (status, body) = get(&app, "/segments?bogus=1&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// GET /maps
// ---------------------------------------------------------------------------

#[tokio::test]
async fn maps_lists_sorted_ids() {
    let (app, store) = app();
    store.create_link(&root_link("m2", "p1")).unwrap();
    store.create_link(&root_link("m1", "p1")).unwrap();
    store.create_link(&root_link("m3", "p2")).unwrap();

    let (status, body) = get(&app, "/maps?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["m1", "m2", "m3"]));

    let (status, body) = get(&app, "/maps?process=p2&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["m3"]));
}

// ---------------------------------------------------------------------------
// Evidences
// ---------------------------------------------------------------------------

#[tokio::test]
async fn evidences_list_is_total() {
    let (app, _) = app();
    let (status, body) = get(&app, &format!("/evidences/{}", "cd".repeat(32))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn add_evidence_then_conflict() {
    let (app, store) = app();
    let link_hash = store.create_link(&root_link("m1", "p")).unwrap();
    let evidence = serde_json::to_value(Evidence::new("b", "p")).unwrap();
    let uri = format!("/evidences/{}", link_hash.to_hex());

    let (status, _) = post(&app, &uri, &evidence).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, &uri, &evidence).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("evidence already exists"));

    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn created_links_match_their_http_projection() {
    let (app, store) = app();
    let link: Link = serde_json::from_value(json!({
        "state": {"value": 42},
        "meta": {
            "mapId": "m1",
            "process": "p",
            "tags": ["a"],
            "priority": 2.0
        }
    }))
    .unwrap();
    let (status, body) = post(&app, "/segments", &serde_json::to_value(&link).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let via_http: Segment = serde_json::from_value(body).unwrap();
    let via_store = store.get_segment(&via_http.meta.link_hash).unwrap().unwrap();
    assert_eq!(via_http, via_store);
}
