//! Numeric error codes and their categories.
//!
//! Codes are grouped into 1000-wide bands per category, mirroring the
//! convention used elsewhere in this codebase's error types.
//! - 1000-1999: malformed requests
//! - 2000-2999: authentication / authorization
//! - 3000-3999: registry lookup failures
//! - 4000-4999: delivery-only outcomes
//! - 9000-9999: general / unexpected

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    BadRequest = 1000,
    InvalidServiceName = 1001,
    InvalidAddress = 1002,
    InvalidPort = 1003,

    Unauthorized = 2000,
    InvalidToken = 2001,
    Forbidden = 2002,

    NotFound = 3000,
    Gone = 3001,

    Timeout = 4000,
    Nack = 4001,
    DeadLetter = 4002,
    Expired = 4003,

    Unknown = 9999,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::InvalidServiceName => "INVALID_SERVICE_NAME",
            ErrorCode::InvalidAddress => "INVALID_ADDRESS",
            ErrorCode::InvalidPort => "INVALID_PORT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Gone => "GONE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Nack => "NACK",
            ErrorCode::DeadLetter => "DEAD_LETTER",
            ErrorCode::Expired => "EXPIRED",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::ClientError,
            2000..=2999 => ErrorCategory::Auth,
            3000..=3999 => ErrorCategory::Registry,
            4000..=4999 => ErrorCategory::Delivery,
            _ => ErrorCategory::General,
        }
    }

    /// Whether a caller may reasonably retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::Timeout | ErrorCode::Nack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    ClientError,
    Auth,
    Registry,
    Delivery,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::ClientError => write!(f, "CLIENT_ERROR"),
            ErrorCategory::Auth => write!(f, "AUTH"),
            ErrorCategory::Registry => write!(f, "REGISTRY"),
            ErrorCategory::Delivery => write!(f, "DELIVERY"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}
