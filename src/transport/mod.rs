//! The `transport` module connects the relay to the network.
//!
//! `message` defines the transport events the broker consumes and the status
//! it answers with; `websocket` is the server that produces those events from
//! real sockets.

pub mod message;
pub mod websocket;

pub use message::{EventResponse, RelayEvent};
pub use websocket::start_websocket_server;
