//! Wire-format shapes for the registry and broker HTTP surfaces (§6).
//! Shared between the server side (serializing responses) and the
//! discovery client / delivery engine (deserializing them on the way
//! back in), so the two sides of the contract cannot drift apart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::envelope::{DeliveryMode, MessageEnvelope};
use crate::registry::{Protocol, ServiceInstance};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub address: String,
    pub port: u32,
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub instance_id: String,
    pub service: String,
    pub lease_expires_at: DateTime<Utc>,
    pub ttl: u64,
    pub token: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub service_name: String,
    pub instance_id: String,
    pub auth_token: String,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub status: String,
    pub token: String,
    pub ttl: u64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateTokenRequest {
    pub instance_id: String,
}

#[derive(Debug, Serialize)]
pub struct RotateTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceDto {
    pub service_name: String,
    pub instance_id: String,
    pub ip: String,
    pub port: u16,
    pub protocol: Protocol,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    #[serde(rename = "ttl")]
    pub ttl_ms: u64,
    pub env: Option<String>,
    pub role: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl From<ServiceInstance> for ServiceInstanceDto {
    fn from(i: ServiceInstance) -> Self {
        Self {
            service_name: i.service_name,
            instance_id: i.instance_id,
            ip: i.ip,
            port: i.port,
            protocol: i.protocol,
            registered_at: i.registered_at,
            last_heartbeat: i.last_heartbeat,
            ttl_ms: i.ttl_ms,
            env: i.env,
            role: i.role,
            metadata: i.metadata,
        }
    }
}

impl From<ServiceInstanceDto> for ServiceInstance {
    fn from(d: ServiceInstanceDto) -> Self {
        Self {
            service_name: d.service_name,
            instance_id: d.instance_id,
            ip: d.ip,
            port: d.port,
            protocol: d.protocol,
            registered_at: d.registered_at,
            last_heartbeat: d.last_heartbeat,
            ttl_ms: d.ttl_ms,
            env: d.env,
            role: d.role,
            metadata: d.metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InstancesResponse {
    pub instances: Vec<ServiceInstanceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default, rename = "services")]
    pub service_names: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub only_alive: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub services: HashMap<String, Vec<ServiceInstanceDto>>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub payload: serde_json::Value,
    pub metadata: EnvelopeMetadataDto,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadataDto {
    pub schema_version: String,
    pub event_type: String,
    pub topic: String,
    pub publisher_service_name: String,
    pub publisher_instance_id: String,
    #[serde(default)]
    pub partition_key: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub delivery_mode: Option<DeliveryMode>,
    #[serde(default, rename = "ttl")]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub deduplication_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub topic: String,
    pub callback_path: String,
    pub consumer_identity: ConsumerIdentityDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerIdentityDto {
    pub service_name: String,
    pub instance_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    pub topic: String,
    pub instance_id: String,
}

/// Outbound delivery body: `POST https://{ip}:{port}/{callbackPath}`.
#[derive(Debug, Serialize)]
pub struct DeliveryRequest<'a> {
    pub message: &'a MessageEnvelope,
    pub context: DeliveryContextDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContextDto {
    pub delivery_attempt: u32,
    pub consumer_group: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeliveryOutcomeDto {
    #[serde(default)]
    pub ack: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}
