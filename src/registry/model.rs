//! The Service Instance record (§3) and the boundary validators the
//! registry HTTP surface applies before it ever touches the store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Mtls,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Mtls
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub service_name: String,
    pub instance_id: String,
    pub ip: String,
    pub port: u16,
    pub protocol: Protocol,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub ttl_ms: u64,
    pub env: Option<String>,
    pub role: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl ServiceInstance {
    /// §3 invariant 2, evaluated at the moment of access: `now - lastHeartbeat <= ttl`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        let age_ms = (now - self.last_heartbeat).num_milliseconds();
        age_ms >= 0 && (age_ms as u64) <= self.ttl_ms
    }

    pub fn matches_role(&self, role: Option<&str>) -> bool {
        role.map_or(true, |want| self.role.as_deref() == Some(want))
    }

    pub fn matches_env(&self, env: Option<&str>) -> bool {
        env.map_or(true, |want| self.env.as_deref() == Some(want))
    }

    pub fn matches_metadata(&self, filter: &HashMap<String, String>) -> bool {
        filter.iter().all(|(k, v)| self.metadata.get(k).map(|mv| mv == v).unwrap_or(false))
    }
}

/// IPv4 dotted-quad only; embedded spaces or letters are rejected (§8).
pub fn validate_ipv4(ip: &str) -> Result<(), CoreError> {
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(invalid_address(ip));
    }
    for octet in octets {
        if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid_address(ip));
        }
        if octet.parse::<u16>().map(|v| v > 255).unwrap_or(true) {
            return Err(invalid_address(ip));
        }
    }
    Ok(())
}

fn invalid_address(ip: &str) -> CoreError {
    crate::error::ErrorBuilder::new(ErrorCode::InvalidAddress, format!("not an IPv4 dotted-quad: {ip}")).build()
}

/// Port values 0 and 65536 are rejected; 1 and 65535 are accepted (§8).
/// `port` is typed `u32` at the boundary precisely so 65536 is representable
/// and rejectable rather than silently truncating to 0 on a `u16`.
pub fn validate_port(port: u32) -> Result<u16, CoreError> {
    if port == 0 || port > 65535 {
        return Err(
            crate::error::ErrorBuilder::new(ErrorCode::InvalidPort, format!("port out of range: {port}")).build()
        );
    }
    Ok(port as u16)
}
