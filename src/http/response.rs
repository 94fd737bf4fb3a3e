//! JSON envelopes and error-to-status mapping.
//!
//! Successful mutations answer `{"success": true, "<entity>": {...}}`.
//! Every failure answers `{"success": false, "error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::blockchain::BlockchainError;
use crate::portal::PortalError;

/// `{"success": true, key: value}`.
pub fn success<T: Serialize>(status: StatusCode, key: &'static str, value: T) -> Response {
    let value = match serde_json::to_value(value) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to serialize response");
        }
    };
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(key.to_string(), value);
    (status, Json(Value::Object(body))).into_response()
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let message: String = message.into();
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

impl PortalError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Conflict(_) => StatusCode::CONFLICT,
            PortalError::Invalid(_) => StatusCode::BAD_REQUEST,
            PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
            PortalError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PortalError::Chain(BlockchainError::NotAvailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            PortalError::Chain(_) | PortalError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        failure(status, self.to_string())
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "Page not found.")
}
