//! The `broker` module is the signaling relay itself.
//!
//! - `engine`: `Broker`, the per-event entry point
//! - `dispatcher`: subscribe / unsubscribe / publish / ping
//! - `lifecycle`: connect and disconnect handling
//! - `delivery`: pushing payloads to connections, stale detection
//! - `registry`: best-effort client over the durable topic store
//! - `message`, `topic`: protocol and data types

pub mod delivery;
pub mod dispatcher;
pub mod engine;
pub mod lifecycle;
pub mod message;
pub mod registry;
pub mod topic;

pub use delivery::{DeliverySender, Transport};
pub use engine::Broker;
pub use message::{ServerMessage, SignalingMessage};
pub use registry::RegistryClient;

#[cfg(test)]
mod tests;
