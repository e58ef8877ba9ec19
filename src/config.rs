//! Process configuration (§10.3), loaded from a single TOML file the way
//! this codebase's original config loader worked, extended with the mTLS
//! material paths and the interval knobs §6 enumerates.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, InfraResultExt, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub tls: TlsConfig,
    pub discovery: DiscoveryConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// mTLS material (§10.6). `production` forces TLS 1.3; otherwise TLS 1.2 is
/// accepted (§6: "minimum TLS 1.2; production deployments must force 1.3").
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    pub server_cert_path: String,
    pub server_key_path: String,
    pub client_cert_path: String,
    pub client_key_path: String,
    pub ca_bundle_path: String,
    #[serde(default)]
    pub production: bool,
}

/// §6 configuration knobs plus the §5 default outbound timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_ping_timeout_ms")]
    pub service_ping_timeout_ms: u64,
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
    #[serde(default = "default_deliver_timeout_ms")]
    pub deliver_timeout_ms: u64,
    #[serde(default = "default_register_timeout_ms")]
    pub register_timeout_ms: u64,
}

fn default_cache_ttl_ms() -> u64 {
    30_000
}
fn default_ping_timeout_ms() -> u64 {
    2_000
}
fn default_resolve_timeout_ms() -> u64 {
    5_000
}
fn default_deliver_timeout_ms() -> u64 {
    10_000
}
fn default_register_timeout_ms() -> u64 {
    10_000
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: default_cache_ttl_ms(),
            service_ping_timeout_ms: default_ping_timeout_ms(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            deliver_timeout_ms: default_deliver_timeout_ms(),
            register_timeout_ms: default_register_timeout_ms(),
        }
    }
}

/// Refresh Scheduler cadences (§4.I); the scheduler itself still enforces
/// the one-minute floor regardless of what is configured here (§8).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_token_refresh_interval_ms")]
    pub token_refresh_interval_ms: u64,
    #[serde(default = "default_ttl_refresh_interval_ms")]
    pub ttl_refresh_interval_ms: u64,
    #[serde(default = "default_cleanup_service_interval_ms")]
    pub cleanup_service_interval_ms: u64,
}

fn default_token_refresh_interval_ms() -> u64 {
    900_000
}
fn default_ttl_refresh_interval_ms() -> u64 {
    60_000
}
fn default_cleanup_service_interval_ms() -> u64 {
    60_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            token_refresh_interval_ms: default_token_refresh_interval_ms(),
            ttl_refresh_interval_ms: default_ttl_refresh_interval_ms(),
            cleanup_service_interval_ms: default_cleanup_service_interval_ms(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .into_core(ErrorCode::Unknown, format!("failed to read config file: {path}"))?;
        toml::from_str(&content)
            .map_err(anyhow::Error::from)
            .into_core(ErrorCode::Unknown, format!("failed to parse config file: {path}"))
    }
}
