//! Delivery sender
//!
//! Pushes a JSON payload to one connection through the downstream
//! `Transport`. A `Gone` report is the only reliable sign that a connection
//! died without a clean disconnect, so it triggers the same cleanup a
//! disconnect would. Other failures are logged and dropped; there is no retry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::broker::lifecycle::Lifecycle;
use crate::utils::error::DeliveryError;

/// Push channel to live connections.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver one text frame to `connection_id`.
    async fn post_to_connection(&self, connection_id: &str, data: String)
    -> Result<(), DeliveryError>;
}

#[derive(Clone)]
pub struct DeliverySender {
    transport: Arc<dyn Transport>,
    lifecycle: Lifecycle,
}

impl DeliverySender {
    pub fn new(transport: Arc<dyn Transport>, lifecycle: Lifecycle) -> Self {
        Self {
            transport,
            lifecycle,
        }
    }

    pub async fn send<T>(&self, connection_id: &str, payload: &T)
    where
        T: Serialize + ?Sized + Sync,
    {
        let data = match serde_json::to_string(payload) {
            Ok(data) => data,
            Err(e) => {
                warn!(connection_id, error = %e, "Failed to serialize payload");
                return;
            }
        };

        match self.transport.post_to_connection(connection_id, data).await {
            Ok(()) => {}
            Err(DeliveryError::Gone) => {
                info!(connection_id, "Found stale connection, deleting");
                if let Err(e) = self.lifecycle.on_disconnect(connection_id).await {
                    error!(connection_id, error = %e, "Stale connection cleanup failed");
                }
            }
            Err(e) => {
                warn!(connection_id, error = %e, "Error when sending");
            }
        }
    }
}

impl std::fmt::Debug for DeliverySender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliverySender")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
