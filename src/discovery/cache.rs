//! Discovery Cache (§3, §4.E): an in-process, per-entry-TTL cache of
//! resolved instances. No negative caching — only successful resolutions
//! are ever stored.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::clock::SharedClock;
use crate::registry::ServiceInstance;

struct CacheEntry {
    instance: ServiceInstance,
    expires_at: DateTime<Utc>,
}

pub struct DiscoveryCache {
    clock: SharedClock,
    ttl_ms: u64,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl DiscoveryCache {
    pub fn new(clock: SharedClock, ttl_ms: u64) -> Arc<Self> {
        Arc::new(Self { clock, ttl_ms, entries: RwLock::new(HashMap::new()) })
    }

    /// A TTL of 0 means "do not cache": every `get` returns `None` (§8).
    pub async fn get(&self, service_name: &str) -> Option<ServiceInstance> {
        if self.ttl_ms == 0 {
            return None;
        }
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        match entries.get(service_name) {
            Some(entry) if entry.expires_at > now => Some(entry.instance.clone()),
            Some(_) => {
                entries.remove(service_name);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, service_name: &str, instance: ServiceInstance) {
        if self.ttl_ms == 0 {
            return;
        }
        let expires_at = self.clock.now() + chrono::Duration::milliseconds(self.ttl_ms as i64);
        self.entries.write().await.insert(service_name.to_string(), CacheEntry { instance, expires_at });
    }

    pub async fn invalidate(&self, service_name: &str) {
        self.entries.write().await.remove(service_name);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::registry::Protocol;
    use std::collections::HashMap as StdHashMap;

    fn instance() -> ServiceInstance {
        ServiceInstance {
            service_name: "svc".into(),
            instance_id: "i1".into(),
            ip: "127.0.0.1".into(),
            port: 8080,
            protocol: Protocol::Mtls,
            registered_at: Utc::now(),
            last_heartbeat: Utc::now(),
            ttl_ms: 20_000,
            env: None,
            role: None,
            metadata: StdHashMap::new(),
        }
    }

    #[tokio::test]
    async fn zero_ttl_never_caches() {
        let clock = FakeClock::new(0);
        let cache = DiscoveryCache::new(clock, 0);
        cache.put("svc", instance()).await;
        assert!(cache.get("svc").await.is_none());
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let clock = FakeClock::new(0);
        let cache = DiscoveryCache::new(clock.clone(), 1_000);
        cache.put("svc", instance()).await;
        assert!(cache.get("svc").await.is_some());
        clock.advance(1_001);
        assert!(cache.get("svc").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let clock = FakeClock::new(0);
        let cache = DiscoveryCache::new(clock, 10_000);
        cache.put("svc", instance()).await;
        cache.invalidate("svc").await;
        assert!(cache.get("svc").await.is_none());
    }
}
