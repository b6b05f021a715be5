//! # sigrelay
//!
//! `sigrelay` is a topic-based WebSocket signaling relay for peer-to-peer
//! clients. Peers subscribe to topics, publish messages that are forwarded
//! verbatim to every subscriber of a topic, and ping for liveness. The relay
//! keeps no per-connection state between events: the only thing it stores is
//! the topic → subscriber-set registry.
//!
//! ## Core Modules
//!
//! - `broker`: the relay: dispatching signaling messages, connection
//!   lifecycle, delivery and stale-connection cleanup.
//! - `client`: live connections held by this process and the delivery
//!   transport built on them.
//! - `config`: loading settings from file and environment.
//! - `persistence`: the durable topic registry (`sled`) and an in-memory one.
//! - `transport`: transport events and the WebSocket server producing them.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod persistence;
pub mod transport;
pub mod utils;
