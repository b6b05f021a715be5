use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::delivery::Transport;
use crate::broker::topic::SubscriberId;
use crate::utils::error::DeliveryError;

/// A live WebSocket connection as seen by the relay.
#[derive(Debug, Clone)]
pub struct Client {
    /// Connection id handed to the registry as the subscriber id.
    pub id: SubscriberId,

    /// Outbound frames for this connection's send loop.
    pub sender: UnboundedSender<WsMessage>,
}

impl Client {
    /// Wrap `sender` under a freshly generated `conn-<uuid>` id.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("conn-{}", uuid::Uuid::new_v4()),
            sender,
        }
    }
}

/// Connections held by this process, keyed by id.
///
/// This is the delivery transport for the WebSocket server. A connection that
/// is not (or no longer) registered here is reported as `Gone`.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    clients: Mutex<HashMap<SubscriberId, Client>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<SubscriberId, Client>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, client: Client) {
        self.clients().insert(client.id.clone(), client);
    }

    pub fn remove(&self, id: &str) -> Option<Client> {
        self.clients().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Transport for ConnectionHub {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        data: String,
    ) -> Result<(), DeliveryError> {
        let sender = match self.clients().get(connection_id) {
            Some(client) => client.sender.clone(),
            None => return Err(DeliveryError::Gone),
        };

        sender
            .send(WsMessage::text(data))
            .map_err(|_| DeliveryError::Gone)
    }
}
