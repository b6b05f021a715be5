//! Topic records
//!
//! A `Topic` is a snapshot of one registry entry: its name and the set of
//! connection ids subscribed to it at the time it was read. The registry owns
//! the authoritative copy; a `Topic` is never written back.

use std::collections::HashSet;

/// Opaque connection identifier assigned by the transport.
pub type SubscriberId = String;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashSet<SubscriberId>,
}

impl Topic {
    /// Snapshot of `name` holding `subscribers`.
    pub fn with_subscribers(
        name: impl Into<String>,
        subscribers: impl IntoIterator<Item = SubscriberId>,
    ) -> Self {
        Self {
            name: name.into(),
            subscribers: subscribers.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.subscribers.contains(id)
    }
}
