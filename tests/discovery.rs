//! Discovery Client scenarios against real mTLS listeners: an unhealthy
//! cached instance triggers a cache invalidation and a fresh registry
//! lookup, and a registry entry with nothing listening behind it surfaces
//! as `Gone`.

mod common;

use std::collections::HashMap as StdHashMap;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use mesh_control_plane::clock::system_clock;
use mesh_control_plane::discovery::{DiscoveryCache, DiscoveryClient};
use mesh_control_plane::dto::{InstancesResponse, ServiceInstanceDto};
use mesh_control_plane::registry::{Protocol, ServiceInstance};
use mesh_control_plane::CoreError;

fn instance_on(port: u16) -> ServiceInstance {
    ServiceInstance {
        service_name: "order-gateway-service".into(),
        instance_id: format!("i-{port}"),
        ip: "127.0.0.1".into(),
        port,
        protocol: Protocol::Mtls,
        registered_at: Utc::now(),
        last_heartbeat: Utc::now(),
        ttl_ms: 20_000,
        env: None,
        role: None,
        metadata: StdHashMap::new(),
    }
}

async fn ping_ok() -> &'static str {
    "pong"
}

/// A registry stub that always answers `/services/:name` with one fixed
/// instance, regardless of the name asked for.
fn registry_stub_returning(instance: ServiceInstance) -> Router {
    Router::new()
        .route(
            "/services/{name}",
            get(move |_: axum::extract::Path<String>| {
                let instance = instance.clone();
                async move { Json(InstancesResponse { instances: vec![ServiceInstanceDto::from(instance)] }) }
            }),
        )
        .route("/ping", get(ping_ok))
}

#[tokio::test]
async fn unhealthy_cached_instance_is_invalidated_and_a_fresh_lookup_succeeds() {
    // Cache points at a port nothing is listening on; the registry stub and
    // the live instance's own /ping both live on a second, real listener.
    let stale_port = 19591;
    let live_port = 19592;
    let registry_port = 19593;

    let _subscriber = common::spawn_stub_server(&format!("127.0.0.1:{live_port}"), Router::new().route("/ping", get(ping_ok))).await;
    let _registry =
        common::spawn_stub_server(&format!("127.0.0.1:{registry_port}"), registry_stub_returning(instance_on(live_port))).await;

    let clock = system_clock();
    let cache = DiscoveryCache::new(clock, 30_000);
    cache.put("order-gateway-service", instance_on(stale_port)).await;

    let http = common::test_mtls_client("client-subscriber");
    let discovery = DiscoveryClient::new(
        format!("https://127.0.0.1:{registry_port}"),
        http,
        cache,
        Duration::from_millis(500),
        Duration::from_millis(500),
    );

    let resolved = discovery.find_service("order-gateway-service").await.unwrap();
    assert_eq!(resolved.port, live_port);
}

#[tokio::test]
async fn resolved_instance_with_nothing_listening_behind_it_is_gone() {
    let dead_port = 19594;
    let registry_port = 19595;

    let _registry =
        common::spawn_stub_server(&format!("127.0.0.1:{registry_port}"), registry_stub_returning(instance_on(dead_port))).await;

    let clock = system_clock();
    let cache = DiscoveryCache::new(clock, 30_000);
    let http = common::test_mtls_client("client-subscriber");
    let discovery = DiscoveryClient::new(
        format!("https://127.0.0.1:{registry_port}"),
        http,
        cache,
        Duration::from_millis(500),
        Duration::from_millis(500),
    );

    let err = discovery.find_service("order-gateway-service").await.unwrap_err();
    assert!(matches!(err, CoreError::Gone { .. }));
}
