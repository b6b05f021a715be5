//! The `persistence` module holds the durable topic registry: the only state the
//! relay keeps between events.
//!
//! `TopicStore` is the contract every backend satisfies. Each call is atomic
//! for the single topic it touches; nothing spans topics. Two backends ship
//! with the crate:
//!
//! - `SledStore`: embedded `sled` database, survives restarts.
//! - `MemoryStore`: in-process map, used for development and tests.

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::broker::topic::{SubscriberId, Topic};
use crate::utils::error::RegistryError;

/// One page of a registry scan.
#[derive(Debug, Default)]
pub struct TopicPage {
    pub topics: Vec<Topic>,
    /// Key to resume after; `None` once the registry is exhausted.
    pub next: Option<String>,
}

/// Durable topic → subscriber-set storage.
#[async_trait]
pub trait TopicStore: Send + Sync + 'static {
    /// Add `subscriber` to `topic`, creating the topic when absent.
    async fn add(&self, topic: &str, subscriber: &str) -> Result<(), RegistryError>;

    /// Remove `subscriber` from `topic`. Absent topics and members are fine.
    async fn remove(&self, topic: &str, subscriber: &str) -> Result<(), RegistryError>;

    /// Current subscriber set of `topic`; empty when the topic is unknown.
    async fn members(&self, topic: &str) -> Result<HashSet<SubscriberId>, RegistryError>;

    /// Up to `limit` topics ordered by name, strictly after `start_after`.
    async fn scan(&self, start_after: Option<&str>, limit: usize)
    -> Result<TopicPage, RegistryError>;
}
