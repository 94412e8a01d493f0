use tokio::net::TcpListener;

use crate::config::HttpConfig;
use crate::error::{HttpError, HttpResult};
use crate::router::{build_router, SharedAdapter};

/// HTTP server hosting the store projection.
pub struct StoreHttpServer {
    config: HttpConfig,
    adapter: SharedAdapter,
}

impl StoreHttpServer {
    pub fn new(config: HttpConfig, adapter: SharedAdapter) -> Self {
        Self { config, adapter }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.adapter.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> HttpResult<()> {
        let app = build_router(self.adapter);
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|e| HttpError::Internal(e.to_string()))?;
        tracing::info!("weave store listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| HttpError::Internal(e.to_string()))
    }
}
