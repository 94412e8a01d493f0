//! HTTP/JSON projection of the adapter contract.
//!
//! [`build_router`] exposes any [`weave_store::Adapter`] as a REST surface:
//!
//! - `GET /` — store information
//! - `POST /segments` — create a link, returns its segment
//! - `GET /segments/{hash}` — fetch one segment
//! - `GET /segments?offset=&limit=&mapId=&process=&prevLinkHash=&tags=&linkHashes=`
//! - `GET /maps?offset=&limit=&process=`
//! - `GET /evidences/{hash}` / `POST /evidences/{hash}`
//!
//! Validation failures and evidence conflicts map to 400, absent resources
//! to 404, backend failures to 500; error bodies are
//! `{"error": message, "status": code}`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod params;
pub mod router;
pub mod server;

pub use config::HttpConfig;
pub use error::{HttpError, HttpResult};
pub use router::{build_router, AppState, SharedAdapter};
pub use server::StoreHttpServer;
