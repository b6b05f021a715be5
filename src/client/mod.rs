//! The `client` module tracks the WebSocket connections this process holds.
//!
//! `Client` pairs a connection id with the channel feeding its socket;
//! `ConnectionHub` maps ids to clients and is the delivery transport the
//! broker pushes through.

pub mod connection;
pub use connection::{Client, ConnectionHub};
