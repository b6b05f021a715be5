//! Registry client
//!
//! Best-effort wrapper over a `TopicStore`. Mutations and point lookups never
//! fail from the caller's point of view: store errors are logged and the
//! operation is treated as a no-op (or an empty result). Only the full scan
//! reports errors, since disconnect cleanup cannot pretend a partial scan
//! was complete.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, Stream, TryStreamExt};
use tracing::warn;

use crate::broker::topic::{SubscriberId, Topic};
use crate::persistence::TopicStore;
use crate::utils::error::RegistryError;

#[derive(Clone)]
pub struct RegistryClient {
    store: Arc<dyn TopicStore>,
    page_size: usize,
}

enum Scan {
    Start,
    After(String),
    Done,
}

impl RegistryClient {
    pub fn new(store: Arc<dyn TopicStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub async fn add_subscriber(&self, topic: &str, connection_id: &str) {
        if let Err(e) = self.store.add(topic, connection_id).await {
            warn!(topic, connection_id, error = %e, "Cannot update topic");
        }
    }

    pub async fn remove_subscriber(&self, topic: &str, connection_id: &str) {
        if let Err(e) = self.store.remove(topic, connection_id).await {
            warn!(topic, connection_id, error = %e, "Cannot update topic");
        }
    }

    /// Current subscribers of `topic`; empty if the topic is unknown or the
    /// store could not be read.
    pub async fn list_subscribers(&self, topic: &str) -> HashSet<SubscriberId> {
        match self.store.members(topic).await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                warn!(topic, error = %e, "Cannot get topic");
                HashSet::new()
            }
        }
    }

    /// Lazily scan every topic in the registry, one page at a time.
    ///
    /// Each call starts a fresh scan. The stream ends after the last page or
    /// right after yielding the first page error.
    pub fn list_all_topics(
        &self,
    ) -> impl Stream<Item = Result<Topic, RegistryError>> + Send + 'static {
        let store = self.store.clone();
        let page_size = self.page_size;

        stream::try_unfold(Scan::Start, move |scan| {
            let store = store.clone();
            async move {
                let start_after = match scan {
                    Scan::Done => return Ok::<_, RegistryError>(None),
                    Scan::Start => None,
                    Scan::After(key) => Some(key),
                };
                let page = store.scan(start_after.as_deref(), page_size).await?;
                let next = page.next.map_or(Scan::Done, Scan::After);
                Ok::<_, RegistryError>(Some((page.topics, next)))
            }
        })
        .map_ok(|topics| stream::iter(topics.into_iter().map(Ok::<Topic, RegistryError>)))
        .try_flatten()
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
