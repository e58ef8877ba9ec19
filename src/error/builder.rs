//! Fluent builder for constructing a [`CoreError`] with request-scoped
//! details that are logged internally but not necessarily echoed to the
//! client (§7: "internal errors are logged with request context and never
//! leak stack traces to clients").

use super::{CoreError, ErrorCode};
use std::collections::HashMap;

pub struct ErrorBuilder {
    code: ErrorCode,
    reason: String,
    details: Option<String>,
    params: Option<HashMap<String, String>>,
}

impl ErrorBuilder {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into(), details: None, params: None }
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.get_or_insert_with(HashMap::new).insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> CoreError {
        let reason = match &self.details {
            Some(details) => format!("{} ({details})", self.reason),
            None => self.reason,
        };
        match self.code {
            ErrorCode::BadRequest | ErrorCode::InvalidServiceName | ErrorCode::InvalidAddress | ErrorCode::InvalidPort => {
                CoreError::BadRequest { reason, details: self.details }
            }
            ErrorCode::Unauthorized => CoreError::Unauthorized { reason },
            ErrorCode::InvalidToken => CoreError::InvalidToken { reason },
            ErrorCode::Forbidden => CoreError::Forbidden { reason },
            ErrorCode::NotFound => CoreError::NotFound { reason },
            ErrorCode::Gone => CoreError::Gone { reason },
            ErrorCode::Timeout => CoreError::Timeout { reason },
            ErrorCode::Nack => CoreError::Nack { reason },
            ErrorCode::DeadLetter => CoreError::DeadLetter { reason },
            ErrorCode::Expired => CoreError::Expired { reason },
            ErrorCode::Unknown => CoreError::Unknown { reason },
        }
    }
}
