use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Relay failures. Every variant answers HTTP 500 with `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream returned malformed JSON: {0}")]
    MalformedUpstream(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        error!(error = %self, "Relay error");
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
