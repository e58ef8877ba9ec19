//! Discovery Client (§4.E): cache, remote lookup, and liveness probing for
//! any service instance calling another one.

pub mod cache;
pub mod client;

pub use cache::DiscoveryCache;
pub use client::DiscoveryClient;
