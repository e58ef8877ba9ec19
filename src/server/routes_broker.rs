//! Message Broker HTTP Surface (§6): publish, subscribe, unsubscribe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use uuid::Uuid;

use crate::broker::envelope::{DeliveryInfo, EnvelopeMetadata, MessageEnvelope, PublisherIdentity, RoutingInfo, SecurityInfo};
use crate::broker::Subscription;
use crate::dto::{PublishRequest, SubscriptionRequest, UnsubscribeRequest};
use crate::error::{ErrorBuilder, ErrorCode, Result};

use super::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/message", post(publish)).route("/subscription", post(subscribe).delete(unsubscribe))
}

async fn publish(State(state): State<Arc<AppState>>, Json(body): Json<PublishRequest>) -> Result<StatusCode> {
    let meta = body.metadata;
    if meta.topic.is_empty() {
        return Err(ErrorBuilder::new(ErrorCode::BadRequest, "topic must not be empty").build());
    }
    let envelope = MessageEnvelope {
        metadata: EnvelopeMetadata {
            // never accepted from the publisher (§3 Global Invariant 4):
            // always assigned here, server-side.
            message_id: Uuid::new_v4().to_string(),
            emitted_at: Utc::now(),
            schema_version: meta.schema_version,
            event_type: meta.event_type,
            topic: meta.topic,
            publisher: PublisherIdentity { service_name: meta.publisher_service_name, instance_id: meta.publisher_instance_id },
            routing: Some(RoutingInfo { partition_key: meta.partition_key, priority: meta.priority }),
            delivery: Some(DeliveryInfo {
                mode: meta.delivery_mode.unwrap_or(crate::broker::DeliveryMode::AtMostOnce),
                ttl_ms: meta.ttl_ms.unwrap_or(0),
                deduplication_id: meta.deduplication_id,
            }),
            security: Some(SecurityInfo::default()),
        },
        payload: body.payload,
    };

    let dispatch = Arc::clone(&state.dispatch);
    tokio::spawn(async move {
        dispatch.dispatch(envelope).await;
    });

    Ok(StatusCode::NO_CONTENT)
}

async fn subscribe(State(state): State<Arc<AppState>>, Json(body): Json<SubscriptionRequest>) -> Result<StatusCode> {
    state
        .subscriptions
        .subscribe(Subscription {
            topic: body.topic,
            callback_path: body.callback_path,
            subscriber_service_name: body.consumer_identity.service_name,
            subscriber_instance_id: body.consumer_identity.instance_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unsubscribe(State(state): State<Arc<AppState>>, Json(body): Json<UnsubscribeRequest>) -> Result<StatusCode> {
    state.subscriptions.unsubscribe(&body.topic, &body.instance_id).await;
    Ok(StatusCode::NO_CONTENT)
}
