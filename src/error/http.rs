//! Projects [`CoreError`] onto the HTTP status code table from §6 and
//! renders the JSON error body returned to clients. 4xx outcomes are
//! returned as-is; 5xx-equivalent (`Unknown`) outcomes never echo internal
//! detail, only the reason string.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use super::CoreError;

impl CoreError {
    /// §6 status code mapping. `Timeout`/`Nack`/`DeadLetter`/`Expired` are
    /// delivery-only kinds never surfaced over the registry/broker HTTP
    /// contract; they map to 500 only as a defensive fallback.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            CoreError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            CoreError::InvalidToken { .. } => StatusCode::from_u16(498).expect("498 is a valid status code"),
            CoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::Gone { .. } => StatusCode::GONE,
            CoreError::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Timeout { .. }
            | CoreError::Nack { .. }
            | CoreError::DeadLetter { .. }
            | CoreError::Expired { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody { code: self.code().as_str(), message: self.reason().to_string() };
        if status.is_server_error() {
            tracing::error!(code = %self.code(), reason = %self.reason(), "request failed");
        } else {
            tracing::debug!(code = %self.code(), "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
