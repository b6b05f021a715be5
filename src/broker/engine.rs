//! Relay engine
//!
//! `Broker` is the entry point the transport feeds events into. It owns no
//! state of its own: every event re-reads the registry, so any number of
//! `Broker` instances may serve the same store.

use std::sync::Arc;

use tracing::{debug, error};

use crate::broker::delivery::{DeliverySender, Transport};
use crate::broker::dispatcher::Dispatcher;
use crate::broker::lifecycle::Lifecycle;
use crate::broker::message::SignalingMessage;
use crate::broker::registry::RegistryClient;
use crate::persistence::TopicStore;
use crate::transport::message::{EventResponse, RelayEvent};
use crate::utils::error::RelayError;

#[derive(Clone, Debug)]
pub struct Broker {
    registry: RegistryClient,
    lifecycle: Lifecycle,
    dispatcher: Dispatcher,
}

impl Broker {
    pub fn new(
        store: Arc<dyn TopicStore>,
        transport: Arc<dyn Transport>,
        page_size: usize,
    ) -> Self {
        let registry = RegistryClient::new(store, page_size);
        let lifecycle = Lifecycle::new(registry.clone());
        let sender = DeliverySender::new(transport, lifecycle.clone());
        let dispatcher = Dispatcher::new(registry.clone(), sender);
        Self {
            registry,
            lifecycle,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Handle one transport event.
    ///
    /// Always answers 200 unless something unexpected broke, in which case
    /// the event is logged and a 500 carrying the error text is returned.
    pub async fn handle_event(&self, event: RelayEvent) -> EventResponse {
        match self.process(&event).await {
            Ok(()) => EventResponse::ok(),
            Err(e) => {
                error!(
                    connection_id = event.connection_id(),
                    ?event,
                    error = %e,
                    "Error handling event"
                );
                EventResponse::internal_error(e.to_string())
            }
        }
    }

    async fn process(&self, event: &RelayEvent) -> Result<(), RelayError> {
        match event {
            RelayEvent::Connect { connection_id } => {
                self.lifecycle.on_connect(connection_id);
                Ok(())
            }
            RelayEvent::Disconnect { connection_id } => {
                self.lifecycle.on_disconnect(connection_id).await
            }
            RelayEvent::Message {
                connection_id,
                body,
            } => {
                match SignalingMessage::parse(body.as_deref().unwrap_or("{}")) {
                    Some(message) => self.dispatcher.dispatch(connection_id, message).await,
                    None => debug!(connection_id = %connection_id, "Ignoring unrecognized message"),
                }
                Ok(())
            }
            RelayEvent::Unrouted {
                route,
                connection_id,
            } => {
                debug!(
                    connection_id = %connection_id,
                    route = %route,
                    "Ignoring event on unknown route"
                );
                Ok(())
            }
        }
    }
}
