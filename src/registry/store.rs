//! Registry Store (§4.B): the in-memory `serviceName -> instanceId -> ServiceInstance`
//! mapping plus the token side table, with the single-writer-at-a-time
//! discipline from §5 — reads take a read guard, writes take a write guard
//! for the minimum window needed, and no network I/O ever happens while a
//! lock is held.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::clock::SharedClock;
use crate::error::{CoreError, ErrorBuilder, ErrorCode};
use crate::identity::{self, Token, TokenTable};

use super::catalog::ServiceCatalog;
use super::model::ServiceInstance;

/// Fields supplied by a caller to `register`; timestamps and the token are
/// always server-assigned and never taken from this struct.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub service_name: String,
    pub instance_id: Option<String>,
    pub ip: String,
    pub port: u16,
    pub protocol: super::model::Protocol,
    pub env: Option<String>,
    pub role: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Optional filters accepted by `resolveOne` and `query` (§4.D).
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    pub role: Option<String>,
    pub env: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl InstanceFilter {
    fn matches(&self, instance: &ServiceInstance) -> bool {
        instance.matches_role(self.role.as_deref())
            && instance.matches_env(self.env.as_deref())
            && instance.matches_metadata(&self.metadata)
    }
}

#[derive(Debug, Default)]
struct ServiceBucket {
    instances: HashMap<String, ServiceInstance>,
}

pub struct RegistryStore {
    catalog: ServiceCatalog,
    clock: SharedClock,
    buckets: RwLock<HashMap<String, ServiceBucket>>,
    /// secondary index so `rotate_token`/`heartbeat`-by-id-alone can find
    /// the owning bucket without a full scan.
    owner_of: RwLock<HashMap<String, String>>,
    tokens: TokenTable,
    round_robin: RwLock<HashMap<String, AtomicUsize>>,
}

impl RegistryStore {
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn new(catalog: ServiceCatalog, clock: SharedClock) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            clock,
            buckets: RwLock::new(HashMap::new()),
            owner_of: RwLock::new(HashMap::new()),
            tokens: TokenTable::new(),
            round_robin: RwLock::new(HashMap::new()),
        })
    }

    /// `register(instance)` (§4.B).
    pub async fn register(&self, input: RegisterInput) -> Result<(ServiceInstance, Token), CoreError> {
        if !self.catalog.contains(&input.service_name) {
            return Err(ErrorBuilder::new(
                ErrorCode::InvalidServiceName,
                format!("service name not in catalog: {}", input.service_name),
            )
            .build());
        }
        super::model::validate_ipv4(&input.ip)?;

        let now = self.clock.now();
        let instance_id = input
            .instance_id
            .clone()
            .unwrap_or_else(|| identity::generate_instance_id(&input.service_name, &input.ip, input.port));

        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(input.service_name.clone()).or_default();

        let (effective, token) = if let Some(existing) = bucket.instances.get_mut(&instance_id) {
            existing.ip = input.ip;
            existing.port = input.port;
            existing.protocol = input.protocol;
            existing.env = input.env.or(existing.env.take());
            existing.role = input.role.or(existing.role.take());
            for (k, v) in input.metadata {
                existing.metadata.insert(k, v);
            }
            existing.last_heartbeat = now;
            let token = self.tokens.rotate(&instance_id).await;
            (existing.clone(), token)
        } else {
            let instance = ServiceInstance {
                service_name: input.service_name.clone(),
                instance_id: instance_id.clone(),
                ip: input.ip,
                port: input.port,
                protocol: input.protocol,
                registered_at: now,
                last_heartbeat: now,
                ttl_ms: self.default_ttl_ms(),
                env: input.env,
                role: input.role,
                metadata: input.metadata,
            };
            let token = self.tokens.issue(&instance_id).await;
            bucket.instances.insert(instance_id.clone(), instance.clone());
            (instance, token)
        };
        drop(buckets);
        self.owner_of.write().await.insert(instance_id, input.service_name);

        tracing::debug!(service_name = %effective.service_name, instance_id = %effective.instance_id, "registered");
        Ok((effective, token))
    }

    /// `heartbeat(serviceName, instanceId)` (§4.B).
    pub async fn heartbeat(&self, service_name: &str, instance_id: &str) -> Result<u64, CoreError> {
        let now = self.clock.now();
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .get_mut(service_name)
            .ok_or_else(|| ErrorBuilder::new(ErrorCode::NotFound, "unknown service instance").build())?;
        let instance = bucket
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| ErrorBuilder::new(ErrorCode::NotFound, "unknown service instance").build())?;
        instance.last_heartbeat = now;
        tracing::debug!(service_name, instance_id, "heartbeat");
        Ok(instance.ttl_ms)
    }

    /// `rotateToken(instanceId)` (§4.B). Requires the instance to currently
    /// be registered somewhere, since a token with no owning instance would
    /// violate invariant 1.
    pub async fn rotate_token(&self, instance_id: &str) -> Result<Token, CoreError> {
        if !self.owner_of.read().await.contains_key(instance_id) {
            return Err(ErrorBuilder::new(ErrorCode::NotFound, "unknown instance id").build());
        }
        Ok(self.tokens.rotate(instance_id).await)
    }

    pub async fn validate_token(&self, instance_id: &str, candidate: &str) -> bool {
        self.tokens.validate(instance_id, candidate).await
    }

    /// `resolve(serviceName)` (§4.B): returns live instances, evicting any
    /// expired ones encountered along the way (§3 invariant 2).
    pub async fn resolve(&self, service_name: &str) -> Result<Vec<ServiceInstance>, CoreError> {
        if !self.catalog.contains(service_name) {
            return Err(ErrorBuilder::new(ErrorCode::NotFound, "unknown service name").build());
        }
        let now = self.clock.now();
        let expired = self.evict_expired_locked(service_name, now).await;
        for instance_id in expired {
            self.owner_of.write().await.remove(&instance_id);
            self.tokens.remove(&instance_id).await;
        }
        let buckets = self.buckets.read().await;
        Ok(buckets.get(service_name).map(|b| b.instances.values().cloned().collect()).unwrap_or_default())
    }

    /// `resolveOne(serviceName, filter?)` (§4.D): round-robin over the live,
    /// filter-matching candidates with a monotonically advancing cursor
    /// scoped per `serviceName`.
    pub async fn resolve_one(
        &self,
        service_name: &str,
        filter: &InstanceFilter,
    ) -> Result<ServiceInstance, CoreError> {
        let live = self.resolve(service_name).await?;
        let candidates: Vec<&ServiceInstance> = live.iter().filter(|i| filter.matches(i)).collect();
        if candidates.is_empty() {
            return Err(ErrorBuilder::new(ErrorCode::Gone, format!("no live instances for {service_name}")).build());
        }
        let index = {
            let cursors = self.round_robin.read().await;
            if let Some(cursor) = cursors.get(service_name) {
                cursor.fetch_add(1, Ordering::Relaxed)
            } else {
                drop(cursors);
                let mut cursors = self.round_robin.write().await;
                let cursor = cursors.entry(service_name.to_string()).or_insert_with(|| AtomicUsize::new(0));
                cursor.fetch_add(1, Ordering::Relaxed)
            }
        };
        Ok(candidates[index % candidates.len()].clone())
    }

    /// `query({serviceName? | serviceNames?, metadata?, onlyAlive})` (§4.D).
    pub async fn query(
        &self,
        service_names: &[String],
        filter: &InstanceFilter,
        only_alive: bool,
    ) -> HashMap<String, Vec<ServiceInstance>> {
        let mut out = HashMap::new();
        for name in service_names {
            let instances = if only_alive {
                self.resolve(name).await.unwrap_or_default()
            } else {
                let buckets = self.buckets.read().await;
                buckets.get(name).map(|b| b.instances.values().cloned().collect()).unwrap_or_default()
            };
            out.insert(name.clone(), instances.into_iter().filter(|i| filter.matches(i)).collect());
        }
        out
    }

    /// `get(serviceName, instanceId)`.
    pub async fn get(&self, service_name: &str, instance_id: &str) -> Option<ServiceInstance> {
        let now = self.clock.now();
        let buckets = self.buckets.read().await;
        let instance = buckets.get(service_name)?.instances.get(instance_id)?;
        if instance.is_live(now) {
            Some(instance.clone())
        } else {
            None
        }
    }

    /// `list()`: never contains ghost service names (§4.B).
    pub async fn list(&self) -> HashMap<String, Vec<ServiceInstance>> {
        let buckets = self.buckets.read().await;
        buckets.iter().map(|(name, bucket)| (name.clone(), bucket.instances.values().cloned().collect())).collect()
    }

    /// `remove(serviceName, instanceId)`: explicit deregistration.
    pub async fn remove(&self, service_name: &str, instance_id: &str) {
        let mut buckets = self.buckets.write().await;
        if let Some(bucket) = buckets.get_mut(service_name) {
            bucket.instances.remove(instance_id);
            if bucket.instances.is_empty() {
                buckets.remove(service_name);
            }
        }
        drop(buckets);
        self.owner_of.write().await.remove(instance_id);
        self.tokens.remove(instance_id).await;
    }

    /// Every instance currently held, regardless of liveness — used by the
    /// lease manager's sweep (§4.C), which decides liveness itself.
    pub async fn snapshot_all(&self) -> Vec<ServiceInstance> {
        let buckets = self.buckets.read().await;
        buckets.values().flat_map(|b| b.instances.values().cloned()).collect()
    }

    fn default_ttl_ms(&self) -> u64 {
        20_000
    }

    /// Evicts expired instances from one bucket, dropping the bucket itself
    /// if it becomes empty, and returns the evicted instance ids so the
    /// caller can clean up the token table and owner index outside this
    /// critical section.
    async fn evict_expired_locked(&self, service_name: &str, now: chrono::DateTime<chrono::Utc>) -> HashSet<String> {
        let mut buckets = self.buckets.write().await;
        let Some(bucket) = buckets.get_mut(service_name) else {
            return HashSet::new();
        };
        let expired: HashSet<String> =
            bucket.instances.values().filter(|i| !i.is_live(now)).map(|i| i.instance_id.clone()).collect();
        for id in &expired {
            bucket.instances.remove(id);
        }
        if bucket.instances.is_empty() {
            buckets.remove(service_name);
        }
        expired
    }

    /// Used by the lease manager to evict a single instance by id once it
    /// has decided (outside any lock) that the lease has expired.
    pub async fn evict(&self, service_name: &str, instance_id: &str) {
        self.remove(service_name, instance_id).await;
        tracing::info!(service_name, instance_id, "evicted: lease expired");
    }
}
