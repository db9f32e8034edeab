//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use vpower_power::{FetchError, PowerError};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RpcError::InvalidRequest(_) | RpcError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            RpcError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PowerError> for RpcError {
    fn from(e: PowerError) -> Self {
        match e {
            PowerError::InvalidRange(msg) => RpcError::InvalidRange(msg),
            fetch @ PowerError::Fetch { .. } => RpcError::Upstream(fetch.to_string()),
        }
    }
}

impl From<FetchError> for RpcError {
    fn from(e: FetchError) -> Self {
        RpcError::Upstream(e.to_string())
    }
}

/// Rendered as `{"error": "..."}` with the matching status code.
impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
