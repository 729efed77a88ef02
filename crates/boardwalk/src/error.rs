// ── Boundary error mapping ──
//
// Every handler failure renders as `{"detail": "<message>"}` with the
// mapped status. Upstream trouble is a 502; local faults are a 500; the
// registry contributes the plain 4xx cases.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    /// ThingsBoard could not be reached or rejected a typed wrapper call.
    #[error("ThingsBoard error: {0}")]
    Upstream(boardwalk_api::Error),

    /// Local fault: missing base URL, bad verb, undecodable upstream shape.
    #[error("{0}")]
    Internal(boardwalk_api::Error),

    /// Registry lookup for an id that does not exist.
    #[error("device {0} not found")]
    NotFound(Uuid),

    /// Payload rejected before touching the store.
    #[error("{0}")]
    Validation(String),

    /// The inbound body could not be buffered.
    #[error("failed to read request body: {0}")]
    BodyRead(axum::Error),
}

impl From<boardwalk_api::Error> for ApiError {
    fn from(err: boardwalk_api::Error) -> Self {
        if err.is_upstream_failure() {
            Self::Upstream(err)
        } else {
            Self::Internal(err)
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::BodyRead(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("{status}: {self}");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
