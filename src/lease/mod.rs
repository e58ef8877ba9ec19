//! Lease Manager (§4.C): a cooperative background task that periodically
//! evicts instances whose lease has expired.
//!
//! Grounded on this codebase's existing interval-timer-plus-shutdown-signal
//! pattern (the client-side heartbeat loop in the discovery factory):
//! `tokio::select!` between an interval tick and a shutdown receiver, with
//! the sweep itself snapshotting candidates under a short lock and then
//! issuing removals outside it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use crate::registry::RegistryStore;

pub struct LeaseManager {
    registry: Arc<RegistryStore>,
    interval: Duration,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl LeaseManager {
    pub fn new(registry: Arc<RegistryStore>, sweep_interval: Duration) -> Arc<Self> {
        Arc::new(Self { registry, interval: sweep_interval, shutdown: Mutex::new(None), handle: Mutex::new(None) })
    }

    /// Starts the periodic sweep loop. A second call while already running
    /// is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut shutdown_guard = self.shutdown.lock().await;
        if shutdown_guard.is_some() {
            return;
        }
        let (tx, mut rx) = mpsc::channel::<()>(1);
        *shutdown_guard = Some(tx);
        drop(shutdown_guard);

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        this.sweep().await;
                    }
                    _ = rx.recv() => {
                        // stop() completes the current cycle (already done above)
                        // and does not start another.
                        break;
                    }
                }
            }
        });
        *self.handle.lock().await = Some(handle);
    }

    /// Stops the loop. Completes the current scan cycle but does not start
    /// another.
    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().await.take() {
            drop(tx);
        }
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }

    /// A manual sweep, exposed for tests.
    pub async fn sweep(&self) {
        let now = self.registry.clock().now();
        let candidates = self.registry.snapshot_all().await;
        let expired: Vec<(String, String)> = candidates
            .into_iter()
            .filter(|i| !i.is_live(now))
            .map(|i| (i.service_name, i.instance_id))
            .collect();
        for (service_name, instance_id) in expired {
            // Each removal is its own short critical section; a failure for
            // one instance must not abort the rest of the sweep.
            self.registry.evict(&service_name, &instance_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::registry::{RegisterInput, ServiceCatalog};
    use std::collections::HashMap;

    #[tokio::test]
    async fn manual_sweep_evicts_expired_instances() {
        let clock = FakeClock::new(0);
        let registry = RegistryStore::new(ServiceCatalog::default(), clock.clone());
        let (instance, _token) = registry
            .register(RegisterInput {
                service_name: "financial-scrapper-service".into(),
                instance_id: None,
                ip: "127.0.0.1".into(),
                port: 8080,
                protocol: crate::registry::Protocol::Mtls,
                env: None,
                role: None,
                metadata: HashMap::new(),
            })
            .await
            .unwrap();

        clock.advance(21_000);
        let lease_manager = LeaseManager::new(registry.clone(), Duration::from_secs(60));
        lease_manager.sweep().await;

        assert!(registry.get("financial-scrapper-service", &instance.instance_id).await.is_none());
    }
}
