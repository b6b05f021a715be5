//! WebSocket transport
//!
//! Accepts TCP connections, upgrades them, and turns socket activity into
//! `RelayEvent`s for the broker:
//! - a new socket becomes a `Connect` event after it is registered in the hub
//! - each text frame becomes a `Message` event, handled in arrival order
//! - socket close (or read error) becomes a `Disconnect` event
//!
//! Outbound frames go through the connection's channel in the hub so that the
//! broker never touches the socket directly.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::client::{Client, ConnectionHub};
use crate::transport::message::{ROUTE_CONNECT, ROUTE_DEFAULT, ROUTE_DISCONNECT, RelayEvent};
use crate::utils::error::RelayError;

/// Bind `addr` and serve WebSocket connections until the listener fails.
pub async fn start_websocket_server(
    addr: String,
    broker: Arc<Broker>,
    hub: Arc<ConnectionHub>,
) -> Result<(), RelayError> {
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("WebSocket server listening on ws://{addr}");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                continue;
            }
        };
        debug!(%peer, "Accepted TCP connection");

        let broker = broker.clone();
        let hub = hub.clone();
        tokio::spawn(async move {
            handle_connection(stream, broker, hub).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    broker: Arc<Broker>,
    hub: Arc<ConnectionHub>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(error = %e, "WebSocket handshake error");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    let connection_id = client.id.clone();
    hub.register(client);

    report(&broker, ROUTE_CONNECT, &connection_id, None).await;

    let send_loop = {
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!(connection_id = %connection_id, error = %e, "Failed to send message");
                    break;
                }
            }
            debug!(connection_id = %connection_id, "Send loop closed");
        })
    };

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(connection_id = %connection_id, error = %e, "Read error, closing");
                break;
            }
        };

        match msg {
            WsMessage::Text(text) => {
                let body = Some(text.as_str().to_owned());
                report(&broker, ROUTE_DEFAULT, &connection_id, body).await;
            }
            WsMessage::Close(_) => break,
            // ping/pong control frames are answered by tungstenite
            _ => {}
        }
    }

    // dropping the hub entry closes the outbound channel and ends the send loop
    hub.remove(&connection_id);
    report(&broker, ROUTE_DISCONNECT, &connection_id, None).await;

    if let Err(e) = send_loop.await {
        error!(connection_id = %connection_id, error = %e, "Send loop panicked");
    }
}

/// Feed one socket event to the broker under its gateway route key.
async fn report(broker: &Broker, route: &str, connection_id: &str, body: Option<String>) {
    let response = broker
        .handle_event(RelayEvent::from_route(route, connection_id, body))
        .await;
    if !response.is_success() {
        warn!(
            connection_id,
            status = response.status_code,
            body = response.body.as_deref().unwrap_or_default(),
            "Event not handled cleanly"
        );
    }
}
