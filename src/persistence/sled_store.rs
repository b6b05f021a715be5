//! Topic registry backed by `sled`.
//!
//! All topics live in one tree keyed by topic name. The value is the JSON
//! encoding of the subscriber list. Updates are compare-and-swap loops on a
//! single key, so concurrent adds and removes on the same topic never lose
//! each other's writes. A topic whose last subscriber leaves is deleted.

use std::collections::{BTreeSet, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use sled::{Db, IVec, Tree};

use super::{TopicPage, TopicStore};
use crate::broker::topic::{SubscriberId, Topic};
use crate::utils::error::RegistryError;

const TOPICS_TREE: &str = "topics";

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    topics: Tree,
}

impl SledStore {
    /// Open or create a sled database at `path`.
    pub fn open(path: &str) -> Result<Self, RegistryError> {
        let db = sled::open(path)?;
        let topics = db.open_tree(TOPICS_TREE)?;
        Ok(Self { db, topics })
    }

    /// Flush dirty buffers to disk.
    pub async fn flush(&self) -> Result<(), RegistryError> {
        self.db.flush_async().await?;
        Ok(())
    }

    /// Apply `change` to the subscriber set of `topic` atomically.
    ///
    /// `change` returns `false` when the set is unchanged, in which case no
    /// write is attempted.
    fn update<F>(&self, topic: &str, mut change: F) -> Result<(), RegistryError>
    where
        F: FnMut(&mut BTreeSet<SubscriberId>) -> bool,
    {
        loop {
            let current = self.topics.get(topic)?;
            let mut subscribers = match &current {
                Some(raw) => decode(raw)?,
                None => BTreeSet::new(),
            };

            if !change(&mut subscribers) {
                return Ok(());
            }

            let proposed = if subscribers.is_empty() {
                None
            } else {
                Some(serde_json::to_vec(&subscribers)?)
            };

            match self.topics.compare_and_swap(topic, current, proposed)? {
                Ok(()) => return Ok(()),
                // lost a race with another writer; re-read and retry
                Err(_) => continue,
            }
        }
    }
}

fn decode(raw: &IVec) -> Result<BTreeSet<SubscriberId>, RegistryError> {
    Ok(serde_json::from_slice(raw)?)
}

fn key_to_name(key: &IVec) -> String {
    String::from_utf8_lossy(key).into_owned()
}

#[async_trait]
impl TopicStore for SledStore {
    async fn add(&self, topic: &str, subscriber: &str) -> Result<(), RegistryError> {
        self.update(topic, |subscribers| subscribers.insert(subscriber.to_string()))
    }

    async fn remove(&self, topic: &str, subscriber: &str) -> Result<(), RegistryError> {
        self.update(topic, |subscribers| subscribers.remove(subscriber))
    }

    async fn members(&self, topic: &str) -> Result<HashSet<SubscriberId>, RegistryError> {
        match self.topics.get(topic)? {
            Some(raw) => Ok(decode(&raw)?.into_iter().collect()),
            None => Ok(HashSet::new()),
        }
    }

    async fn scan(
        &self,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<TopicPage, RegistryError> {
        let lower = match start_after {
            Some(key) => Bound::Excluded(IVec::from(key.as_bytes())),
            None => Bound::Unbounded,
        };

        let mut topics = Vec::new();
        let mut next = None;

        for entry in self.topics.range::<IVec, _>((lower, Bound::Unbounded)) {
            let (key, value) = entry?;
            if topics.len() == limit {
                next = topics.last().map(|topic: &Topic| topic.name.clone());
                break;
            }
            topics.push(Topic::with_subscribers(key_to_name(&key), decode(&value)?));
        }

        Ok(TopicPage { topics, next })
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .field("tree", &TOPICS_TREE)
            .finish()
    }
}
