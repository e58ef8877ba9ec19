//! Composition root (§9, §10.5): the single place that owns the registry
//! store, token table, subscription table, and discovery cache, and wires
//! the HTTP surfaces, lease manager, and refresh scheduler from them.
//!
//! Generalized from this codebase's `ServiceRuntime`/`Task` orchestration:
//! dependency-ordered startup (registry and subscription state exist before
//! anything that reads them starts), a cooperative shutdown signal, and a
//! bounded shutdown timeout with forced abort as a last resort.

pub mod config;

pub use config::RuntimeConfig;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broker::{DeliveryEngine, DispatchEngine, InMemoryDeadLetterSink, SubscriptionTable};
use crate::clock::{system_clock, SharedClock};
use crate::config::Config;
use crate::discovery::{DiscoveryCache, DiscoveryClient};
use crate::error::InfraResult;
use crate::http_client::{build_mtls_client, MtlsClientConfig};
use crate::lease::LeaseManager;
use crate::registry::{RegistryStore, ServiceCatalog};
use crate::scheduler::Scheduler;
use crate::server::{self, AppState};

const DEAD_LETTER_CAPACITY: usize = 1_000;

/// Everything the process needs to serve the registry and broker surfaces,
/// built once at startup and torn down together on shutdown.
pub struct ControlPlane {
    config: Config,
    registry: Arc<RegistryStore>,
    subscriptions: Arc<SubscriptionTable>,
    dispatch: Arc<DispatchEngine>,
    lease_manager: Arc<LeaseManager>,
    scheduler: Arc<Scheduler>,
    runtime_config: RuntimeConfig,
}

impl ControlPlane {
    pub fn new(config: Config) -> InfraResult<Self> {
        let clock: SharedClock = system_clock();
        let registry = RegistryStore::new(ServiceCatalog::default(), clock.clone());
        let subscriptions = Arc::new(SubscriptionTable::new());

        let http_client = build_mtls_client(&MtlsClientConfig {
            client_cert_path: config.tls.client_cert_path.clone(),
            client_key_path: config.tls.client_key_path.clone(),
            ca_bundle_path: config.tls.ca_bundle_path.clone(),
            connect_timeout: Duration::from_millis(config.discovery.resolve_timeout_ms),
            request_timeout: Duration::from_millis(config.discovery.deliver_timeout_ms),
        })?;

        let registry_base_url = format!("https://{}", config.server.bind_addr());
        let discovery_cache = DiscoveryCache::new(clock.clone(), config.discovery.cache_ttl_ms);
        let discovery = Arc::new(DiscoveryClient::new(
            registry_base_url,
            http_client.clone(),
            discovery_cache,
            Duration::from_millis(config.discovery.service_ping_timeout_ms),
            Duration::from_millis(config.discovery.resolve_timeout_ms),
        ));

        let dlq = InMemoryDeadLetterSink::new(DEAD_LETTER_CAPACITY);
        let delivery = DeliveryEngine::new(discovery, http_client, dlq, clock.clone(), Duration::from_millis(config.discovery.deliver_timeout_ms));
        let dispatch = Arc::new(DispatchEngine::new(Arc::clone(&subscriptions), delivery));

        let lease_manager = LeaseManager::new(registry.clone(), Duration::from_millis(config.scheduler.cleanup_service_interval_ms));
        let scheduler = Arc::new(Scheduler::new());

        Ok(Self { config, registry, subscriptions, dispatch, lease_manager, scheduler, runtime_config: RuntimeConfig::default() })
    }

    pub fn registry(&self) -> &Arc<RegistryStore> {
        &self.registry
    }

    /// Runs the mTLS HTTP server plus the lease manager and refresh
    /// scheduler until `shutdown` fires, then tears everything down with a
    /// bounded grace period.
    pub async fn run(self, shutdown: CancellationToken) -> InfraResult<()> {
        let addr: SocketAddr = self
            .config
            .server
            .bind_addr()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid server bind address: {e}"))?;
        let tls_config = server::tls::build_server_tls_config(&self.config.tls)?;

        let state = Arc::new(AppState {
            registry: Arc::clone(&self.registry),
            subscriptions: Arc::clone(&self.subscriptions),
            dispatch: Arc::clone(&self.dispatch),
        });
        let router = server::build_router(state, Duration::from_millis(self.config.discovery.register_timeout_ms));

        self.lease_manager.start().await;
        self.scheduler.start();

        let server_result = server::serve_mtls(addr, tls_config, router, shutdown).await;

        let shutdown_timeout = self.runtime_config.shutdown_timeout;
        if tokio::time::timeout(shutdown_timeout, async {
            self.scheduler.stop().await;
            self.lease_manager.stop().await;
        })
        .await
        .is_err()
        {
            tracing::warn!("graceful shutdown exceeded {:?}, remaining tasks were abandoned", shutdown_timeout);
        }

        server_result
    }
}
