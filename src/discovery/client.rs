//! Discovery Client (§4.E): cache, then probe, then fall back to a fresh
//! registry lookup, then probe again.

use std::time::Duration;

use reqwest::Client;

use crate::dto::InstancesResponse;
use crate::error::{CoreError, ErrorBuilder, ErrorCode};
use crate::registry::ServiceInstance;

use super::cache::DiscoveryCache;

pub struct DiscoveryClient {
    registry_base_url: String,
    http: Client,
    cache: std::sync::Arc<DiscoveryCache>,
    probe_timeout: Duration,
    resolve_timeout: Duration,
}

impl DiscoveryClient {
    pub fn new(
        registry_base_url: String,
        http: Client,
        cache: std::sync::Arc<DiscoveryCache>,
        probe_timeout: Duration,
        resolve_timeout: Duration,
    ) -> Self {
        Self { registry_base_url, http, cache, probe_timeout, resolve_timeout }
    }

    /// `findService(name)` (§4.E): cache -> probe -> registry lookup -> probe.
    pub async fn find_service(&self, name: &str) -> Result<ServiceInstance, CoreError> {
        if let Some(cached) = self.cache.get(name).await {
            if self.probe(&cached).await {
                return Ok(cached);
            }
            self.cache.invalidate(name).await;
        }

        let fresh = self.fetch_one_live(name).await?;
        if self.probe(&fresh).await {
            self.cache.put(name, fresh.clone()).await;
            return Ok(fresh);
        }
        Err(ErrorBuilder::new(ErrorCode::Gone, format!("resolved instance for {name} is unreachable")).build())
    }

    /// Queries the Registry HTTP Surface for the service and takes its
    /// first live instance; there is no dedicated `resolveOne` endpoint in
    /// the interface contract, so this reuses the plain listing call.
    async fn fetch_one_live(&self, name: &str) -> Result<ServiceInstance, CoreError> {
        let url = format!("{}/services/{}", self.registry_base_url, name);
        let response = self
            .http
            .get(&url)
            .timeout(self.resolve_timeout)
            .send()
            .await
            .map_err(|e| ErrorBuilder::new(ErrorCode::NotFound, format!("registry lookup failed: {e}")).build())?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ErrorBuilder::new(ErrorCode::NotFound, format!("unknown service: {name}")).build());
        }
        if response.status() == reqwest::StatusCode::GONE {
            return Err(ErrorBuilder::new(ErrorCode::Gone, format!("no live instances for {name}")).build());
        }
        if !response.status().is_success() {
            return Err(ErrorBuilder::new(ErrorCode::Unknown, format!("registry returned {}", response.status())).build());
        }

        let body: InstancesResponse = response
            .json()
            .await
            .map_err(|e| ErrorBuilder::new(ErrorCode::Unknown, format!("malformed registry response: {e}")).build())?;

        body.instances
            .into_iter()
            .next()
            .map(ServiceInstance::from)
            .ok_or_else(|| ErrorBuilder::new(ErrorCode::Gone, format!("no live instances for {name}")).build())
    }

    /// Probe definition (§4.E): `GET /ping`, any non-2xx or transport error
    /// maps to `false` with no retry at this layer.
    async fn probe(&self, instance: &ServiceInstance) -> bool {
        let url = format!("https://{}:{}/ping", instance.ip, instance.port);
        match self.http.get(&url).timeout(self.probe_timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
