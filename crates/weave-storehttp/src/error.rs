use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use weave_store::StoreError;

/// Errors rendered by the HTTP projection.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not Found")]
    NotFound,

    #[error("internal server error")]
    Internal(String),
}

pub type HttpResult<T> = Result<T, HttpError>;

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        // Conflicts are validation errors to HTTP clients.
        if err.is_validation() {
            HttpError::BadRequest(err.to_string())
        } else {
            HttpError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            HttpError::NotFound => (StatusCode::NOT_FOUND, "Not Found".into()),
            HttpError::Internal(detail) => {
                tracing::error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".into())
            }
        };
        let body = Json(json!({ "error": message, "status": status.as_u16() }));
        (status, body).into_response()
    }
}
