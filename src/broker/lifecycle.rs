//! Connection lifecycle
//!
//! Connect is purely informational. Disconnect has to find every topic that
//! still lists the connection: the registry keeps no connection → topics
//! index, so this is a full scan.

use futures::StreamExt;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::broker::registry::RegistryClient;
use crate::utils::error::RelayError;

#[derive(Clone, Debug)]
pub struct Lifecycle {
    registry: RegistryClient,
}

impl Lifecycle {
    pub fn new(registry: RegistryClient) -> Self {
        Self { registry }
    }

    pub fn on_connect(&self, connection_id: &str) {
        info!(connection_id, "Connected");
    }

    /// Remove `connection_id` from every topic that lists it.
    ///
    /// Removals run concurrently and are all awaited, even when the scan
    /// fails part way; the scan error is returned afterwards.
    pub async fn on_disconnect(&self, connection_id: &str) -> Result<(), RelayError> {
        info!(connection_id, "Disconnected");

        let mut member_of = Vec::new();
        let mut scan_error = None;

        let mut topics = Box::pin(self.registry.list_all_topics());
        while let Some(entry) = topics.next().await {
            match entry {
                Ok(topic) if topic.contains(connection_id) => member_of.push(topic.name),
                Ok(_) => {}
                Err(e) => {
                    warn!(connection_id, error = %e, "Topic scan failed during cleanup");
                    scan_error = Some(e);
                    break;
                }
            }
        }

        debug!(connection_id, topics = member_of.len(), "Removing from topics");
        join_all(
            member_of
                .iter()
                .map(|topic| self.registry.remove_subscriber(topic, connection_id)),
        )
        .await;

        match scan_error {
            Some(e) => Err(RelayError::Scan(e)),
            None => Ok(()),
        }
    }
}
