//! Message Envelope (§3): metadata is server-assigned and read-only once
//! dispatch begins; payload is opaque to the broker.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMode {
    AtMostOnce,
    AtLeastOnce,
    /// Best-effort: no deduplication store is implemented (§9 open question).
    ExactlyOnce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherIdentity {
    pub service_name: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingInfo {
    pub partition_key: Option<String>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    pub mode: DeliveryMode,
    /// milliseconds; `0` means "no expiry" (§4.H checks `ttl > 0`).
    #[serde(rename = "ttl")]
    pub ttl_ms: u64,
    pub deduplication_id: Option<String>,
}

impl Default for DeliveryInfo {
    fn default() -> Self {
        Self { mode: DeliveryMode::AtMostOnce, ttl_ms: 0, deduplication_id: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityInfo {
    pub auth_context: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    pub message_id: String,
    pub emitted_at: DateTime<Utc>,
    pub schema_version: String,
    pub event_type: String,
    pub topic: String,
    pub publisher: PublisherIdentity,
    pub routing: Option<RoutingInfo>,
    pub delivery: Option<DeliveryInfo>,
    pub security: Option<SecurityInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub metadata: EnvelopeMetadata,
    pub payload: serde_json::Value,
}

impl MessageEnvelope {
    pub fn delivery_mode(&self) -> DeliveryMode {
        self.metadata.delivery.as_ref().map(|d| d.mode).unwrap_or(DeliveryMode::AtMostOnce)
    }

    pub fn ttl_ms(&self) -> u64 {
        self.metadata.delivery.as_ref().map(|d| d.ttl_ms).unwrap_or(0)
    }

    pub fn partition_key(&self) -> Option<&str> {
        self.metadata.routing.as_ref().and_then(|r| r.partition_key.as_deref())
    }

    /// §4.H: TTL expiry check, `now >= emittedAt + ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = self.ttl_ms();
        ttl > 0 && now >= self.metadata.emitted_at + chrono::Duration::milliseconds(ttl as i64)
    }
}

/// §4.H: why a message ended up in the Dead-Letter Sink.
#[derive(Debug, Clone)]
pub enum DeadLetterReason {
    TtlExpired,
    Explicit(String),
}

impl std::fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeadLetterReason::TtlExpired => write!(f, "TTL_EXPIRED"),
            DeadLetterReason::Explicit(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub message_id: String,
    pub topic: String,
    pub subscriber_instance_id: String,
    pub reason: DeadLetterReason,
    pub recorded_at: DateTime<Utc>,
}

/// The sink deliveries are routed to once abandoned. There is deliberately
/// no persistence here (§1 non-goal); the in-memory sink keeps a bounded
/// tail for introspection the way this codebase's metrics collector caps
/// its own history.
pub trait DeadLetterSink: Send + Sync {
    fn record(&self, entry: DeadLetterEntry);
}

pub struct InMemoryDeadLetterSink {
    entries: Mutex<Vec<DeadLetterEntry>>,
    capacity: usize,
}

impl InMemoryDeadLetterSink {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self { entries: Mutex::new(Vec::new()), capacity })
    }

    pub fn entries(&self) -> Vec<DeadLetterEntry> {
        self.entries.lock().expect("dead letter sink mutex poisoned").clone()
    }
}

impl DeadLetterSink for InMemoryDeadLetterSink {
    fn record(&self, entry: DeadLetterEntry) {
        tracing::warn!(
            message_id = %entry.message_id,
            topic = %entry.topic,
            subscriber_instance_id = %entry.subscriber_instance_id,
            reason = %entry.reason,
            "message dead-lettered"
        );
        let mut entries = self.entries.lock().expect("dead letter sink mutex poisoned");
        entries.push(entry);
        if entries.len() > self.capacity {
            let overflow = entries.len() - self.capacity;
            entries.drain(0..overflow);
        }
    }
}
