use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use weave_store::Adapter;

use crate::handlers;

/// The adapter shared by every handler.
pub type SharedAdapter = Arc<dyn Adapter>;

#[derive(Clone)]
pub struct AppState {
    pub adapter: SharedAdapter,
}

/// Build the axum router over an adapter.
pub fn build_router(adapter: SharedAdapter) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route(
            "/segments",
            get(handlers::find_segments).post(handlers::create_segment),
        )
        .route("/segments/{link_hash}", get(handlers::get_segment))
        .route("/maps", get(handlers::get_map_ids))
        .route(
            "/evidences/{link_hash}",
            get(handlers::get_evidences).post(handlers::add_evidence),
        )
        .with_state(AppState { adapter })
}
