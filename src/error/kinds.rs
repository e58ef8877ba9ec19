//! The control plane's single error type.
//!
//! Every fallible operation in this crate returns [`CoreError`]. Variant
//! names are the error *kinds* from the registry/broker contract, not
//! internal implementation types, so that the HTTP surfaces can map them
//! onto status codes with a single `match`.

use super::ErrorCode;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("bad request: {reason}")]
    BadRequest { reason: String, details: Option<String> },

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("not found: {reason}")]
    NotFound { reason: String },

    #[error("gone: {reason}")]
    Gone { reason: String },

    #[error("unknown error: {reason}")]
    Unknown { reason: String },

    /// Delivery-only: the outbound call did not complete within its deadline. Retriable.
    #[error("delivery timed out: {reason}")]
    Timeout { reason: String },

    /// Delivery-only: the subscriber explicitly NACKed. Retriable under AT_LEAST_ONCE.
    #[error("delivery nacked: {reason}")]
    Nack { reason: String },

    /// Delivery-only: the subscriber requested dead-lettering. Terminal.
    #[error("dead lettered: {reason}")]
    DeadLetter { reason: String },

    /// Delivery-only: the message's TTL elapsed before a terminal outcome. Terminal.
    #[error("delivery expired: {reason}")]
    Expired { reason: String },
}

impl CoreError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        CoreError::BadRequest { reason: reason.into(), details: None }
    }

    pub fn bad_request_with_details(reason: impl Into<String>, details: impl Into<String>) -> Self {
        CoreError::BadRequest { reason: reason.into(), details: Some(details.into()) }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        CoreError::Unauthorized { reason: reason.into() }
    }

    pub fn invalid_token(reason: impl Into<String>) -> Self {
        CoreError::InvalidToken { reason: reason.into() }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden { reason: reason.into() }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        CoreError::NotFound { reason: reason.into() }
    }

    pub fn gone(reason: impl Into<String>) -> Self {
        CoreError::Gone { reason: reason.into() }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        CoreError::Unknown { reason: reason.into() }
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        CoreError::Timeout { reason: reason.into() }
    }

    pub fn nack(reason: impl Into<String>) -> Self {
        CoreError::Nack { reason: reason.into() }
    }

    pub fn dead_letter(reason: impl Into<String>) -> Self {
        CoreError::DeadLetter { reason: reason.into() }
    }

    pub fn expired(reason: impl Into<String>) -> Self {
        CoreError::Expired { reason: reason.into() }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::BadRequest { .. } => ErrorCode::BadRequest,
            CoreError::Unauthorized { .. } => ErrorCode::Unauthorized,
            CoreError::InvalidToken { .. } => ErrorCode::InvalidToken,
            CoreError::Forbidden { .. } => ErrorCode::Forbidden,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::Gone { .. } => ErrorCode::Gone,
            CoreError::Unknown { .. } => ErrorCode::Unknown,
            CoreError::Timeout { .. } => ErrorCode::Timeout,
            CoreError::Nack { .. } => ErrorCode::Nack,
            CoreError::DeadLetter { .. } => ErrorCode::DeadLetter,
            CoreError::Expired { .. } => ErrorCode::Expired,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            CoreError::BadRequest { reason, .. }
            | CoreError::Unauthorized { reason }
            | CoreError::InvalidToken { reason }
            | CoreError::Forbidden { reason }
            | CoreError::NotFound { reason }
            | CoreError::Gone { reason }
            | CoreError::Unknown { reason }
            | CoreError::Timeout { reason }
            | CoreError::Nack { reason }
            | CoreError::DeadLetter { reason }
            | CoreError::Expired { reason } => reason,
        }
    }

    /// §7: whether the delivery engine should attempt another delivery.
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Whether this is one of the delivery-only kinds (never produced by the
    /// registry/broker HTTP surfaces themselves, only by the delivery engine).
    pub fn is_delivery_only(&self) -> bool {
        matches!(
            self,
            CoreError::Timeout { .. } | CoreError::Nack { .. } | CoreError::DeadLetter { .. } | CoreError::Expired { .. }
        )
    }
}

/// A structured, loggable rendering of an error's request context, used at
/// the HTTP surfaces so 5xx-equivalent failures are logged with
/// `url, method, ip, message` while 4xx-equivalent ones are not (§7).
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub url: String,
    pub method: String,
    pub client_identity: Option<String>,
    pub params: HashMap<String, String>,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} identity={:?}", self.method, self.url, self.client_identity)
    }
}
