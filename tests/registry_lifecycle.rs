//! Registration, heartbeat/token-rotation, and lease-eviction scenarios,
//! exercised directly against `RegistryStore` + `LeaseManager` with a
//! `FakeClock` so expiry is deterministic.

use std::collections::HashMap;

use mesh_control_plane::clock::FakeClock;
use mesh_control_plane::registry::{Protocol, RegisterInput, RegistryStore, ServiceCatalog};
use mesh_control_plane::LeaseManager;

fn register_input() -> RegisterInput {
    RegisterInput {
        service_name: "financial-scrapper-service".into(),
        instance_id: None,
        ip: "127.0.0.1".into(),
        port: 8080,
        protocol: Protocol::Mtls,
        env: None,
        role: None,
        metadata: HashMap::new(),
    }
}

#[tokio::test]
async fn happy_registration_then_heartbeat_rotates_token_and_invalidates_the_old_one() {
    let clock = FakeClock::new(0);
    let store = RegistryStore::new(ServiceCatalog::default(), clock.clone());

    let (instance, t1) = store.register(register_input()).await.unwrap();
    assert_eq!(instance.ttl_ms, 20_000);
    assert!(store.validate_token(&instance.instance_id, t1.as_str()).await);

    let ttl = store.heartbeat(&instance.service_name, &instance.instance_id).await.unwrap();
    assert_eq!(ttl, 20_000);
    let t2 = store.rotate_token(&instance.instance_id).await.unwrap();
    assert_ne!(t1.as_str(), t2.as_str());

    // the stale token from before rotation must never validate again.
    assert!(!store.validate_token(&instance.instance_id, t1.as_str()).await);
    assert!(store.validate_token(&instance.instance_id, t2.as_str()).await);
}

#[tokio::test]
async fn lease_expires_and_sweep_evicts_the_instance() {
    let clock = FakeClock::new(0);
    let store = RegistryStore::new(ServiceCatalog::default(), clock.clone());
    let (instance, _token) = store.register(register_input()).await.unwrap();

    clock.advance(21_000);

    let lease_manager = LeaseManager::new(store.clone(), std::time::Duration::from_secs(3600));
    lease_manager.sweep().await;

    assert!(store.get(&instance.service_name, &instance.instance_id).await.is_none());
}
