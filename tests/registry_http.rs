//! Registry HTTP Surface scenarios (§8, scenarios 1 & 2), exercised against
//! the real `routes_registry` router behind a genuine mTLS listener, not
//! just the in-process `RegistryStore` API `registry_lifecycle.rs` covers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use mesh_control_plane::broker::{DispatchEngine, InMemoryDeadLetterSink, SubscriptionTable};
use mesh_control_plane::clock::FakeClock;
use mesh_control_plane::discovery::{DiscoveryCache, DiscoveryClient};
use mesh_control_plane::registry::{RegistryStore, ServiceCatalog};
use mesh_control_plane::server::{build_router, AppState};
use mesh_control_plane::{DeliveryEngine, LeaseManager};
use serde_json::{json, Value};

/// Assembles a full `AppState` on top of a `FakeClock`, the same shape
/// `ControlPlane` wires at startup, so the registry routes run for real.
fn app_state(clock: Arc<FakeClock>) -> (Arc<AppState>, Arc<RegistryStore>) {
    let registry = RegistryStore::new(ServiceCatalog::default(), clock.clone());
    let subscriptions = Arc::new(SubscriptionTable::new());

    let http = common::test_mtls_client("client-registry");
    let discovery_cache = DiscoveryCache::new(clock.clone(), 30_000);
    let discovery = Arc::new(DiscoveryClient::new(
        "https://127.0.0.1:1".into(),
        http.clone(),
        discovery_cache,
        Duration::from_millis(500),
        Duration::from_millis(500),
    ));
    let dlq = InMemoryDeadLetterSink::new(100);
    let delivery = DeliveryEngine::new(discovery, http, dlq, clock, Duration::from_millis(500));
    let dispatch = Arc::new(DispatchEngine::new(Arc::clone(&subscriptions), delivery));

    (Arc::new(AppState { registry: Arc::clone(&registry), subscriptions, dispatch }), registry)
}

#[tokio::test]
async fn happy_registration_then_stale_heartbeat_token_is_rejected() {
    let port = 19611;
    let clock = FakeClock::new(0);
    let (state, _registry) = app_state(clock);
    let router = build_router(state, Duration::from_secs(10));
    let _server = common::spawn_stub_server(&format!("127.0.0.1:{port}"), router).await;

    let http = common::test_mtls_client("client-registry");
    let base = format!("https://127.0.0.1:{port}");

    let register_response = http
        .post(format!("{base}/register"))
        .json(&json!({"name": "financial-scrapper-service", "address": "127.0.0.1", "port": 8080, "protocol": "mtls"}))
        .send()
        .await
        .unwrap();
    assert_eq!(register_response.status().as_u16(), 200);
    let body: Value = register_response.json().await.unwrap();
    assert_eq!(body["ttl"], 20_000);
    let instance_id = body["instanceId"].as_str().unwrap().to_string();
    let t1 = body["token"].as_str().unwrap().to_string();

    let heartbeat_response = http
        .post(format!("{base}/heartbeat"))
        .json(&json!({"serviceName": "financial-scrapper-service", "instanceId": instance_id, "authToken": t1}))
        .send()
        .await
        .unwrap();
    assert_eq!(heartbeat_response.status().as_u16(), 200);
    let heartbeat_body: Value = heartbeat_response.json().await.unwrap();
    let t2 = heartbeat_body["token"].as_str().unwrap().to_string();
    assert_ne!(t1, t2);
    assert_eq!(heartbeat_body["ttl"], 20_000);

    // the stale token from before rotation must be rejected; 498 is this
    // contract's dedicated invalid-token code, distinct from a missing one.
    let stale_response = http
        .post(format!("{base}/heartbeat"))
        .json(&json!({"serviceName": "financial-scrapper-service", "instanceId": instance_id, "authToken": t1}))
        .send()
        .await
        .unwrap();
    assert_eq!(stale_response.status().as_u16(), 498);
}

#[tokio::test]
async fn lease_eviction_is_visible_through_the_get_instance_route() {
    let port = 19612;
    let clock = FakeClock::new(0);
    let (state, registry) = app_state(clock.clone());
    let router = build_router(state, Duration::from_secs(10));
    let _server = common::spawn_stub_server(&format!("127.0.0.1:{port}"), router).await;

    let http = common::test_mtls_client("client-registry");
    let base = format!("https://127.0.0.1:{port}");

    let register_response = http
        .post(format!("{base}/register"))
        .json(&json!({"name": "financial-scrapper-service", "address": "127.0.0.1", "port": 8080, "protocol": "mtls"}))
        .send()
        .await
        .unwrap();
    assert_eq!(register_response.status().as_u16(), 200);
    let body: Value = register_response.json().await.unwrap();
    let instance_id = body["instanceId"].as_str().unwrap().to_string();

    clock.advance(21_000);
    let lease_manager = LeaseManager::new(registry, Duration::from_secs(3600));
    lease_manager.sweep().await;

    let get_response = http.get(format!("{base}/services/financial-scrapper-service/{instance_id}")).send().await.unwrap();
    assert_eq!(get_response.status().as_u16(), 404);
}
