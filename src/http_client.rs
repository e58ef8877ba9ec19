//! Builds the `reqwest::Client` used for every outbound call this process
//! makes to another service under mutual TLS: registry resolves, discovery
//! probes, and broker deliveries (§6, §10.6).
//!
//! Grounded on this codebase's existing `ClientBuilder` (chainable timeout
//! configuration), generalized from a single gRPC channel builder into an
//! HTTP client builder that additionally carries the client identity
//! certificate mTLS requires.

use std::time::Duration;

use crate::error::{CoreError, ErrorCode, InfraResultExt};

#[derive(Debug, Clone)]
pub struct MtlsClientConfig {
    pub client_cert_path: String,
    pub client_key_path: String,
    pub ca_bundle_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Builds a `reqwest::Client` presenting the given client certificate on
/// every connection, trusting only the configured CA bundle, matching the
/// server side's requirement to verify a client cert signed by the same CA.
pub fn build_mtls_client(config: &MtlsClientConfig) -> Result<reqwest::Client, CoreError> {
    let cert_pem = std::fs::read(&config.client_cert_path)
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, "failed to read client certificate")?;
    let key_pem = std::fs::read(&config.client_key_path)
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, "failed to read client key")?;
    let mut identity_pem = cert_pem;
    identity_pem.extend_from_slice(&key_pem);
    let identity = reqwest::Identity::from_pem(&identity_pem)
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, "failed to build client identity")?;

    let ca_pem = std::fs::read(&config.ca_bundle_path)
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, "failed to read CA bundle")?;
    let ca_cert = reqwest::Certificate::from_pem(&ca_pem)
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, "failed to parse CA bundle")?;

    reqwest::Client::builder()
        .identity(identity)
        .add_root_certificate(ca_cert)
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, "failed to build mTLS http client")
}
