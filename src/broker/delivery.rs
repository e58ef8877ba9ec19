//! Delivery Engine (§4.H): the per-subscription state machine that
//! resolves a subscriber's current address, attempts delivery, and decides
//! whether to retry, dead-letter, or expire.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::SharedClock;
use crate::discovery::DiscoveryClient;
use crate::dto::{DeliveryContextDto, DeliveryOutcomeDto, DeliveryRequest};
use crate::retry::Backoff;

use super::envelope::{DeadLetterEntry, DeadLetterReason, DeadLetterSink, DeliveryMode, MessageEnvelope};
use super::subscription::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Resolving,
    Sending,
    RetryWait,
    Acked,
    Nacked,
    DeadLettered,
    Expired,
}

impl DeliveryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryState::Acked | DeliveryState::Nacked | DeliveryState::DeadLettered | DeliveryState::Expired)
    }
}

/// Why a single delivery attempt (resolve + send) did not end in an ACK.
enum AttemptFailure {
    Timeout(String),
    Nack(String),
    DeadLetter(String),
}

pub struct DeliveryEngine {
    discovery: Arc<DiscoveryClient>,
    http: reqwest::Client,
    backoff: Backoff,
    deliver_timeout: Duration,
    dlq: Arc<dyn DeadLetterSink>,
    clock: SharedClock,
}

impl DeliveryEngine {
    pub fn new(
        discovery: Arc<DiscoveryClient>,
        http: reqwest::Client,
        dlq: Arc<dyn DeadLetterSink>,
        clock: SharedClock,
        deliver_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self { discovery, http, backoff: Backoff::delivery_default(), deliver_timeout, dlq, clock })
    }

    /// Runs one subscription's delivery to completion, returning the
    /// terminal state reached (§4.H).
    pub async fn deliver(&self, message: Arc<MessageEnvelope>, subscription: Subscription) -> DeliveryState {
        let mode = message.delivery_mode();
        let mut attempt: u32 = 0;

        loop {
            let outcome = match self.discovery.find_service(&subscription.subscriber_service_name).await {
                Ok(instance) => self.send(&instance, &message, &subscription, attempt).await,
                Err(err) => Err(AttemptFailure::Timeout(err.to_string())),
            };

            let Err(failure) = outcome else {
                return DeliveryState::Acked;
            };

            let now = self.clock.now();
            if message.is_expired(now) {
                self.dead_letter(&message, &subscription, DeadLetterReason::TtlExpired);
                return DeliveryState::Expired;
            }

            if let AttemptFailure::DeadLetter(reason) = failure {
                self.dead_letter(&message, &subscription, DeadLetterReason::Explicit(reason));
                return DeliveryState::DeadLettered;
            }

            let should_retry = match mode {
                DeliveryMode::AtMostOnce => false,
                DeliveryMode::AtLeastOnce => true,
                // first failure retries exactly like AT_LEAST_ONCE; the
                // second terminates (§4.H: "best-effort" exactly-once).
                DeliveryMode::ExactlyOnce => attempt == 0,
            };

            if !should_retry {
                return DeliveryState::Nacked;
            }

            tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
            attempt += 1;
        }
    }

    async fn send(
        &self,
        instance: &crate::registry::ServiceInstance,
        message: &MessageEnvelope,
        subscription: &Subscription,
        attempt: u32,
    ) -> Result<(), AttemptFailure> {
        let url = format!("https://{}:{}/{}", instance.ip, instance.port, subscription.callback_path.trim_start_matches('/'));
        let body = DeliveryRequest {
            message,
            context: DeliveryContextDto { delivery_attempt: attempt, consumer_group: subscription.subscriber_service_name.clone() },
        };

        let response = self
            .http
            .post(&url)
            .timeout(self.deliver_timeout)
            .json(&SerializableDelivery { body: &body })
            .send()
            .await
            .map_err(|e| AttemptFailure::Timeout(e.to_string()))?;

        let status = response.status();
        let outcome: DeliveryOutcomeDto = response.json().await.unwrap_or_default();

        if let Some(ack) = outcome.ack.as_deref() {
            if ack.eq_ignore_ascii_case("deadLetter") {
                return Err(AttemptFailure::DeadLetter(outcome.reason.unwrap_or_else(|| "unspecified".into())));
            }
        }

        if status.is_success() {
            return Ok(());
        }
        Err(AttemptFailure::Nack(outcome.reason.unwrap_or_else(|| format!("status {status}"))))
    }

    fn dead_letter(&self, message: &MessageEnvelope, subscription: &Subscription, reason: DeadLetterReason) {
        self.dlq.record(DeadLetterEntry {
            message_id: message.metadata.message_id.clone(),
            topic: message.metadata.topic.clone(),
            subscriber_instance_id: subscription.subscriber_instance_id.clone(),
            reason,
            recorded_at: self.clock.now(),
        });
    }
}

/// `reqwest::Client::json` needs `Serialize`; `DeliveryRequest` already is,
/// this wrapper just lets us pass it by reference without an extra clone.
#[derive(serde::Serialize)]
struct SerializableDelivery<'a> {
    #[serde(flatten)]
    body: &'a DeliveryRequest<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_recognized() {
        assert!(DeliveryState::Acked.is_terminal());
        assert!(DeliveryState::Expired.is_terminal());
        assert!(!DeliveryState::RetryWait.is_terminal());
        assert!(!DeliveryState::Resolving.is_terminal());
    }
}
