//! Dispatch Engine (§4.G): fans a published message out to every current
//! subscriber of its topic, isolating per-subscriber failures.

use std::collections::HashMap;
use std::sync::Arc;

use super::delivery::{DeliveryEngine, DeliveryState};
use super::envelope::MessageEnvelope;
use super::subscription::{Subscription, SubscriptionTable};

pub struct DispatchEngine {
    subscriptions: Arc<SubscriptionTable>,
    delivery: Arc<DeliveryEngine>,
}

impl DispatchEngine {
    pub fn new(subscriptions: Arc<SubscriptionTable>, delivery: Arc<DeliveryEngine>) -> Self {
        Self { subscriptions, delivery }
    }

    /// Dispatches `message` to every subscriber of its topic. Subscribers
    /// are deduplicated by `instanceId` (last occurrence wins) before fan-out,
    /// and each subscription's delivery runs independently so one failure
    /// can never block or corrupt another's (§4.G).
    pub async fn dispatch(&self, message: MessageEnvelope) -> Vec<(String, DeliveryState)> {
        let snapshot = self.subscriptions.subscribers_of(&message.metadata.topic).await;
        let deduped = dedupe_by_instance(snapshot);
        let message = Arc::new(message);

        let mut handles = Vec::with_capacity(deduped.len());
        for subscription in deduped {
            let delivery = Arc::clone(&self.delivery);
            let message = Arc::clone(&message);
            let instance_id = subscription.subscriber_instance_id.clone();
            handles.push((instance_id, tokio::spawn(async move { delivery.deliver(message, subscription).await })));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (instance_id, handle) in handles {
            let state = match handle.await {
                Ok(state) => state,
                Err(join_err) => {
                    tracing::error!(instance_id = %instance_id, error = %join_err, "delivery task panicked");
                    DeliveryState::Nacked
                }
            };
            results.push((instance_id, state));
        }
        results
    }
}

/// Last occurrence wins: later entries in `subscribers_of`'s order replace
/// earlier ones for the same `instanceId`, mirroring how the subscription
/// table itself treats re-subscription.
fn dedupe_by_instance(subscriptions: Vec<Subscription>) -> Vec<Subscription> {
    let mut by_instance: HashMap<String, Subscription> = HashMap::with_capacity(subscriptions.len());
    for subscription in subscriptions {
        by_instance.insert(subscription.subscriber_instance_id.clone(), subscription);
    }
    by_instance.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(instance_id: &str, path: &str) -> Subscription {
        Subscription {
            topic: "t".into(),
            callback_path: path.into(),
            subscriber_service_name: "svc".into(),
            subscriber_instance_id: instance_id.into(),
        }
    }

    #[test]
    fn dedupe_keeps_last_occurrence_per_instance() {
        let deduped = dedupe_by_instance(vec![sub("i1", "/a"), sub("i2", "/b"), sub("i1", "/c")]);
        assert_eq!(deduped.len(), 2);
        let kept = deduped.iter().find(|s| s.subscriber_instance_id == "i1").unwrap();
        assert_eq!(kept.callback_path, "/c");
    }
}
