//! Unified error handling for the control plane.
//!
//! Every surface (registry HTTP, broker HTTP, discovery client, delivery
//! engine) raises [`CoreError`] and lets the HTTP layer project it onto the
//! status code table from the interface contract. Internal infrastructure
//! failures (I/O, TLS setup, config parsing) are carried as `anyhow::Error`
//! until they cross into domain code, at which point [`InfraResultExt`]
//! attaches a `CoreError` kind.

pub mod builder;
pub mod code;
pub mod http;
pub mod kinds;

pub use builder::ErrorBuilder;
pub use code::{ErrorCategory, ErrorCode};
pub use kinds::{CoreError, ErrorContext};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Result type for infrastructure-layer code (file I/O, TLS setup, config
/// loading) that has not yet been classified into a [`CoreError`] kind.
pub type InfraResult<T> = anyhow::Result<T>;

/// Attaches a `CoreError` kind to an infrastructure failure, carrying the
/// original error's `Display` as the detail so it survives into logs.
pub fn map_infra_error<E, S>(error: E, code: ErrorCode, message: S) -> CoreError
where
    E: std::fmt::Display,
    S: Into<String>,
{
    ErrorBuilder::new(code, message.into()).details(error.to_string()).build()
}

pub trait InfraResultExt<T> {
    fn into_core<S>(self, code: ErrorCode, message: S) -> Result<T>
    where
        S: Into<String>;
}

impl<T> InfraResultExt<T> for InfraResult<T> {
    fn into_core<S>(self, code: ErrorCode, message: S) -> Result<T>
    where
        S: Into<String>,
    {
        self.map_err(|err| map_infra_error(err, code, message))
    }
}
