//! Subscription Table (§4.F): `topic -> ordered list of Subscription`,
//! deduplicated per `(topic, subscriberIdentity.instanceId)`.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::{CoreError, ErrorBuilder, ErrorCode};

#[derive(Debug, Clone)]
pub struct Subscription {
    pub topic: String,
    pub callback_path: String,
    pub subscriber_service_name: String,
    pub subscriber_instance_id: String,
}

#[derive(Debug, Default)]
pub struct SubscriptionTable {
    topics: RwLock<HashMap<String, Vec<Subscription>>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self { topics: RwLock::new(HashMap::new()) }
    }

    /// `subscribe`: replaces any existing entry for `(topic, instanceId)`,
    /// so the later registration wins (§8).
    pub async fn subscribe(&self, subscription: Subscription) -> Result<(), CoreError> {
        if subscription.topic.is_empty() {
            return Err(ErrorBuilder::new(ErrorCode::BadRequest, "topic must not be empty").build());
        }
        let mut topics = self.topics.write().await;
        let bucket = topics.entry(subscription.topic.clone()).or_default();
        bucket.retain(|s| s.subscriber_instance_id != subscription.subscriber_instance_id);
        bucket.push(subscription);
        Ok(())
    }

    /// `unsubscribe`: idempotent for an unknown subscription (§8).
    pub async fn unsubscribe(&self, topic: &str, instance_id: &str) {
        let mut topics = self.topics.write().await;
        if let Some(bucket) = topics.get_mut(topic) {
            bucket.retain(|s| s.subscriber_instance_id != instance_id);
            if bucket.is_empty() {
                topics.remove(topic);
            }
        }
    }

    /// A snapshot slice, safe to iterate without holding the table lock.
    pub async fn subscribers_of(&self, topic: &str) -> Vec<Subscription> {
        self.topics.read().await.get(topic).cloned().unwrap_or_default()
    }
}
