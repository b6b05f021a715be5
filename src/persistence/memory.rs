use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{TopicPage, TopicStore};
use crate::broker::topic::{SubscriberId, Topic};
use crate::utils::error::RegistryError;

/// In-memory topic registry.
///
/// Clones share the same map. `set_failing(true)` makes every call fail,
/// which lets tests exercise the relay's error paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    topics: Arc<Mutex<BTreeMap<String, HashSet<SubscriberId>>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("memory store set to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TopicStore for MemoryStore {
    async fn add(&self, topic: &str, subscriber: &str) -> Result<(), RegistryError> {
        self.check()?;
        self.topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .insert(subscriber.to_string());
        Ok(())
    }

    async fn remove(&self, topic: &str, subscriber: &str) -> Result<(), RegistryError> {
        self.check()?;
        let mut topics = self.topics.lock().await;
        if let Some(subscribers) = topics.get_mut(topic) {
            subscribers.remove(subscriber);
            if subscribers.is_empty() {
                topics.remove(topic);
            }
        }
        Ok(())
    }

    async fn members(&self, topic: &str) -> Result<HashSet<SubscriberId>, RegistryError> {
        self.check()?;
        Ok(self
            .topics
            .lock()
            .await
            .get(topic)
            .cloned()
            .unwrap_or_default())
    }

    async fn scan(
        &self,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<TopicPage, RegistryError> {
        self.check()?;
        let topics = self.topics.lock().await;
        let lower = match start_after {
            Some(key) => Bound::Excluded(key.to_string()),
            None => Bound::Unbounded,
        };

        let mut page: Vec<Topic> = topics
            .range((lower, Bound::Unbounded))
            .take(limit.saturating_add(1))
            .map(|(name, subscribers)| Topic::with_subscribers(name.clone(), subscribers.clone()))
            .collect();

        let next = if page.len() > limit {
            page.truncate(limit);
            page.last().map(|topic| topic.name.clone())
        } else {
            None
        };

        Ok(TopicPage { topics: page, next })
    }
}
