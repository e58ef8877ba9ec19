//! Service registry, discovery and message broker control plane.
//!
//! Components, per the interface contract: Identity & Token Module,
//! Registry Store, Lease Manager, Registry HTTP Surface and Discovery
//! Client make up the service registry/discovery plane; Subscription
//! Table, Dispatch Engine and Delivery Engine make up the message broker
//! plane. A Refresh Scheduler keeps a registered instance's token and
//! lease current. Dependency direction is one-way: Broker -> Discovery
//! Client -> Registry; the Registry never depends on the Broker.

pub mod broker;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod dto;
pub mod error;
pub mod http_client;
pub mod identity;
pub mod lease;
pub mod registry;
pub mod retry;
pub mod runtime;
pub mod scheduler;
pub mod server;

pub use broker::{
    DeadLetterEntry, DeadLetterReason, DeadLetterSink, DeliveryEngine, DeliveryMode, DeliveryState,
    DispatchEngine, InMemoryDeadLetterSink, MessageEnvelope, Subscription, SubscriptionTable,
};
pub use clock::{system_clock, Clock, SharedClock, SystemClock};
pub use config::Config;
pub use discovery::{DiscoveryCache, DiscoveryClient};
pub use error::{CoreError, ErrorBuilder, ErrorCategory, ErrorCode, Result};
pub use identity::{generate_instance_id, issue_token, Token, TokenTable};
pub use lease::LeaseManager;
pub use registry::{InstanceFilter, Protocol, RegisterInput, RegistryStore, ServiceCatalog, ServiceInstance};
pub use retry::Backoff;
pub use runtime::ControlPlane;
pub use scheduler::{Job, Scheduler, TokenRefresherJob, TtlRefresherJob};
