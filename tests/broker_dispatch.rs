//! Dispatch Engine and Delivery Engine scenarios: exactly-once fan-out per
//! subscriber instance, and TTL expiry terminating a retry loop with a
//! single dead-letter entry.

mod common;

use std::collections::HashMap as StdHashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use mesh_control_plane::broker::{
    DeliveryInfo, DeliveryMode, EnvelopeMetadata, InMemoryDeadLetterSink, MessageEnvelope, PublisherIdentity,
};
use mesh_control_plane::clock::FakeClock;
use mesh_control_plane::discovery::{DiscoveryCache, DiscoveryClient};
use mesh_control_plane::registry::{Protocol, ServiceInstance};
use mesh_control_plane::{DeliveryEngine, DeliveryState, DispatchEngine, Subscription, SubscriptionTable};

fn subscriber_instance(port: u16) -> ServiceInstance {
    ServiceInstance {
        service_name: "notification-service".into(),
        instance_id: "subscriber-instance".into(),
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

#[derive(Clone, Default)]
struct Hits(Arc<Mutex<Vec<String>>>);

impl Hits {
    /// A handler for one fixed callback path, closing over its own label so
    /// the stub doesn't need a path extractor for static routes.
    fn recorder(&self, label: &'static str) -> impl Clone + Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = &'static str> + Send>> {
        let hits = self.0.clone();
        move || {
            let hits = hits.clone();
            Box::pin(async move {
                hits.lock().unwrap().push(label.to_string());
                "{}"
            })
        }
    }
}

async fn record_failure() -> axum::http::StatusCode {
    axum::http::StatusCode::INTERNAL_SERVER_ERROR
}

fn message(topic: &str, emitted_at: chrono::DateTime<Utc>, mode: DeliveryMode, ttl_ms: u64) -> MessageEnvelope {
    MessageEnvelope {
        metadata: EnvelopeMetadata {
            message_id: "m1".into(),
            emitted_at,
            schema_version: "1.0".into(),
            event_type: "InvoiceCreated".into(),
            topic: topic.into(),
            publisher: PublisherIdentity { service_name: "wallet-ledger-service".into(), instance_id: "p1".into() },
            routing: None,
            delivery: Some(DeliveryInfo { mode, ttl_ms, deduplication_id: None }),
            security: None,
        },
        payload: serde_json::json!({"invoiceId": "inv-1"}),
    }
}

#[tokio::test]
async fn duplicate_instance_subscription_delivers_to_exactly_one_callback() {
    let port = 19601;
    let hits = Hits::default();
    let router = Router::new()
        .route("/a", post(hits.recorder("a")))
        .route("/b", post(hits.recorder("b")))
        .route("/c", post(hits.recorder("c")))
        .route("/ping", get(ping_ok));
    let _subscriber = common::spawn_stub_server(&format!("127.0.0.1:{port}"), router).await;

    let clock = FakeClock::new(0);
    let instance = subscriber_instance(port);
    let cache = DiscoveryCache::new(clock.clone(), 60_000);
    cache.put(&instance.service_name, instance.clone()).await;
    let http = common::test_mtls_client("client-subscriber");
    let discovery = Arc::new(DiscoveryClient::new("https://127.0.0.1:1".into(), http.clone(), cache, Duration::from_millis(500), Duration::from_millis(500)));
    let dlq = InMemoryDeadLetterSink::new(100);
    let delivery = DeliveryEngine::new(discovery, http, dlq, clock, Duration::from_millis(500));

    let subscriptions = SubscriptionTable::new();
    subscriptions
        .subscribe(Subscription {
            topic: "billing.invoice.created".into(),
            callback_path: "/a".into(),
            subscriber_service_name: "notification-service".into(),
            subscriber_instance_id: "i1".into(),
        })
        .await
        .unwrap();
    // same instanceId, different callbackPath: the later registration
    // replaces the earlier one (§8), so /a is never delivered to.
    subscriptions
        .subscribe(Subscription {
            topic: "billing.invoice.created".into(),
            callback_path: "/b".into(),
            subscriber_service_name: "notification-service".into(),
            subscriber_instance_id: "i1".into(),
        })
        .await
        .unwrap();
    subscriptions
        .subscribe(Subscription {
            topic: "billing.invoice.created".into(),
            callback_path: "/c".into(),
            subscriber_service_name: "notification-service".into(),
            subscriber_instance_id: "i2".into(),
        })
        .await
        .unwrap();

    let dispatch = DispatchEngine::new(Arc::new(subscriptions), delivery);
    let msg = message("billing.invoice.created", Utc::now(), DeliveryMode::AtMostOnce, 0);
    let results = dispatch.dispatch(msg).await;

    assert_eq!(results.len(), 2, "i1's duplicate subscription must collapse to a single delivery");
    assert!(results.iter().all(|(_, state)| *state == DeliveryState::Acked));

    let recorded = hits.0.lock().unwrap().clone();
    assert_eq!(recorded.len(), 2);
    assert!(recorded.contains(&"b".to_string()), "the later registration for i1 must win");
    assert!(recorded.contains(&"c".to_string()));
    assert!(!recorded.contains(&"a".to_string()), "the replaced registration must never receive a delivery");
}

#[tokio::test]
async fn ttl_expiry_terminates_retry_with_a_single_dead_letter() {
    let port = 19602;
    let router = Router::new().route("/callback", post(record_failure)).route("/ping", get(ping_ok));
    let _subscriber = common::spawn_stub_server(&format!("127.0.0.1:{port}"), router).await;

    // the clock is already past the message's expiry window by the time
    // delivery starts, so the very first failed attempt is the one whose
    // check crosses emittedAt+ttl (§4.H, §8).
    let clock = FakeClock::new(0);
    let emitted_at = clock.now();
    clock.advance(600);

    let instance = subscriber_instance(port);
    let cache = DiscoveryCache::new(clock.clone(), 60_000);
    cache.put(&instance.service_name, instance.clone()).await;
    let http = common::test_mtls_client("client-subscriber");
    let discovery = Arc::new(DiscoveryClient::new("https://127.0.0.1:1".into(), http.clone(), cache, Duration::from_millis(500), Duration::from_millis(500)));
    let dlq = InMemoryDeadLetterSink::new(100);
    let delivery = DeliveryEngine::new(discovery, http, Arc::clone(&dlq), clock, Duration::from_millis(500));

    let subscription = Subscription {
        topic: "billing.invoice.created".into(),
        callback_path: "/callback".into(),
        subscriber_service_name: "notification-service".into(),
        subscriber_instance_id: "i1".into(),
    };
    let msg = Arc::new(message("billing.invoice.created", emitted_at, DeliveryMode::AtLeastOnce, 500));
    let state = delivery.deliver(msg, subscription).await;

    assert_eq!(state, DeliveryState::Expired);
    let entries = dlq.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason.to_string(), "TTL_EXPIRED");
}
