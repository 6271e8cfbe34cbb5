//! The only place a `Result` error type exists in this service — the core
//! engine never returns one (§4.8). Maps request-time failures onto the
//! status codes §6.1 documents.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),
    #[error("invalid injection count: {0} (must be in [1, 200])")]
    InvalidInjectionCount(u32),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) | AppError::InvalidInjectionCount(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::UnknownProcessor(_) => StatusCode::NOT_FOUND,
        };
        tracing::warn!(error = %self, status = %status, "request rejected");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
