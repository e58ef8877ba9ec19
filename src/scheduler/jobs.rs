//! The two concrete jobs the Refresh Scheduler runs (§4.I): token rotation
//! and lease-TTL heartbeating, both against the Registry Store directly
//! since the scheduler runs inside the same process as the registry.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::registry::RegistryStore;

/// A single scheduled unit of work. `execute` swallows its own errors —
/// the scheduler boundary never sees them (§4.I).
pub trait Job: Send + Sync {
    fn name(&self) -> &str;
    fn interval(&self) -> Duration;
    fn execute(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

pub struct TokenRefresherJob {
    name: String,
    interval: Duration,
    registry: Arc<RegistryStore>,
    instance_id: String,
}

impl TokenRefresherJob {
    pub fn new(instance_id: impl Into<String>, interval: Duration, registry: Arc<RegistryStore>) -> Self {
        let instance_id = instance_id.into();
        Self { name: format!("token-refresh:{instance_id}"), interval, registry, instance_id }
    }
}

impl Job for TokenRefresherJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn execute(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Err(err) = self.registry.rotate_token(&self.instance_id).await {
                tracing::warn!(instance_id = %self.instance_id, error = %err, "token refresh failed");
            }
        })
    }
}

pub struct TtlRefresherJob {
    name: String,
    interval: Duration,
    registry: Arc<RegistryStore>,
    service_name: String,
    instance_id: String,
}

impl TtlRefresherJob {
    pub fn new(
        service_name: impl Into<String>,
        instance_id: impl Into<String>,
        interval: Duration,
        registry: Arc<RegistryStore>,
    ) -> Self {
        let service_name = service_name.into();
        let instance_id = instance_id.into();
        Self { name: format!("ttl-refresh:{instance_id}"), interval, registry, service_name, instance_id }
    }
}

impl Job for TtlRefresherJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn execute(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Err(err) = self.registry.heartbeat(&self.service_name, &self.instance_id).await {
                tracing::warn!(instance_id = %self.instance_id, error = %err, "ttl refresh failed");
            }
        })
    }
}
