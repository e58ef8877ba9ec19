//! Message Broker plane (§4.F-H): subscription table, fan-out dispatch,
//! and per-subscription delivery with retry, dead-lettering and TTL expiry.
//!
//! Depends on the Discovery Client to resolve subscriber addresses but
//! never the other way around (§9 dependency direction).

pub mod delivery;
pub mod dispatch;
pub mod envelope;
pub mod subscription;

pub use delivery::{DeliveryEngine, DeliveryState};
pub use dispatch::DispatchEngine;
pub use envelope::{
    DeadLetterEntry, DeadLetterReason, DeadLetterSink, DeliveryInfo, DeliveryMode, EnvelopeMetadata,
    InMemoryDeadLetterSink, MessageEnvelope, PublisherIdentity, RoutingInfo, SecurityInfo,
};
pub use subscription::{Subscription, SubscriptionTable};
