use futures::future::join_all;
use tracing::debug;

use crate::broker::delivery::DeliverySender;
use crate::broker::message::{ServerMessage, SignalingMessage};
use crate::broker::registry::RegistryClient;

/// Executes one signaling message on behalf of a connection.
///
/// Every registry update or delivery a message triggers is started together
/// and awaited together; one failing never holds up the rest.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: RegistryClient,
    sender: DeliverySender,
}

impl Dispatcher {
    pub fn new(registry: RegistryClient, sender: DeliverySender) -> Self {
        Self { registry, sender }
    }

    pub async fn dispatch(&self, connection_id: &str, message: SignalingMessage) {
        match message {
            SignalingMessage::Subscribe { topics } => {
                debug!(connection_id, ?topics, "Subscribe");
                join_all(
                    topics
                        .iter()
                        .map(|topic| self.registry.add_subscriber(topic, connection_id)),
                )
                .await;
            }
            SignalingMessage::Unsubscribe { topics } => {
                debug!(connection_id, ?topics, "Unsubscribe");
                join_all(
                    topics
                        .iter()
                        .map(|topic| self.registry.remove_subscriber(topic, connection_id)),
                )
                .await;
            }
            SignalingMessage::Publish {
                topic: Some(topic),
                message,
            } => {
                // the publisher is not excluded; it gets its own message back
                // when it is subscribed
                let receivers = self.registry.list_subscribers(&topic).await;
                debug!(connection_id, topic = %topic, receivers = receivers.len(), "Publish");
                join_all(
                    receivers
                        .iter()
                        .map(|receiver| self.sender.send(receiver, &message)),
                )
                .await;
            }
            SignalingMessage::Publish { topic: None, .. } => {
                debug!(connection_id, "Publish without topic ignored");
            }
            SignalingMessage::Ping => {
                self.sender.send(connection_id, &ServerMessage::Pong).await;
            }
        }
    }
}
