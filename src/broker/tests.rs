use super::Broker;
use super::delivery::Transport;
use super::topic::Topic;
use crate::persistence::{MemoryStore, TopicPage, TopicStore};
use crate::transport::message::RelayEvent;
use crate::utils::error::{DeliveryError, RegistryError};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Records every delivery; ids in `gone` report stale, ids in `failing`
/// report a transient error.
#[derive(Default)]
struct RecordingTransport {
    delivered: Mutex<Vec<(String, Value)>>,
    gone: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    fn mark_gone(&self, id: &str) {
        self.gone.lock().unwrap().insert(id.to_string());
    }

    fn mark_failing(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    fn delivered_to(&self, id: &str) -> Vec<Value> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == id)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    fn total(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        data: String,
    ) -> Result<(), DeliveryError> {
        if self.gone.lock().unwrap().contains(connection_id) {
            return Err(DeliveryError::Gone);
        }
        if self.failing.lock().unwrap().contains(connection_id) {
            return Err(DeliveryError::Failed("socket busy".into()));
        }
        let payload: Value = serde_json::from_str(&data).unwrap();
        self.delivered
            .lock()
            .unwrap()
            .push((connection_id.to_string(), payload));
        Ok(())
    }
}

fn setup(page_size: usize) -> (Broker, MemoryStore, Arc<RecordingTransport>) {
    let store = MemoryStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let broker = Broker::new(Arc::new(store.clone()), transport.clone(), page_size);
    (broker, store, transport)
}

async fn message(broker: &Broker, id: &str, body: Value) {
    let response = broker
        .handle_event(RelayEvent::Message {
            connection_id: id.to_string(),
            body: Some(body.to_string()),
        })
        .await;
    assert!(response.is_success());
}

async fn subscribe(broker: &Broker, id: &str, topics: &[&str]) {
    message(broker, id, json!({"type": "subscribe", "topics": topics})).await;
}

fn set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn test_topic_contains() {
    let topic = Topic::with_subscribers("room1", ["A".to_string(), "A".to_string()]);
    assert_eq!(topic.subscribers.len(), 1);
    assert!(topic.contains("A"));
    assert!(!topic.contains("B"));
}

#[tokio::test]
async fn test_subscribe_twice_keeps_one_entry() {
    let (broker, store, _) = setup(10);
    subscribe(&broker, "A", &["room1"]).await;
    subscribe(&broker, "A", &["room1"]).await;
    assert_eq!(store.members("room1").await.unwrap(), set(&["A"]));
}

#[tokio::test]
async fn test_subscribe_without_topics_does_nothing() {
    let (broker, store, _) = setup(10);
    message(&broker, "A", json!({"type": "subscribe"})).await;
    subscribe(&broker, "A", &[]).await;
    assert!(store.scan(None, 10).await.unwrap().topics.is_empty());
}

#[tokio::test]
async fn test_subscribe_to_empty_name_creates_no_topic() {
    let (broker, store, _) = setup(10);
    subscribe(&broker, "A", &["", "room1"]).await;
    let page = store.scan(None, 10).await.unwrap();
    let names: Vec<_> = page.topics.into_iter().map(|topic| topic.name).collect();
    assert_eq!(names, vec!["room1"]);
}

#[tokio::test]
async fn test_unsubscribe_non_member_is_noop() {
    let (broker, store, _) = setup(10);
    subscribe(&broker, "A", &["room1"]).await;
    message(&broker, "B", json!({"type": "unsubscribe", "topics": ["room1", "ghost"]})).await;
    assert_eq!(store.members("room1").await.unwrap(), set(&["A"]));
    assert!(store.members("ghost").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsubscribe_removes_member() {
    let (broker, store, _) = setup(10);
    subscribe(&broker, "A", &["room1", "room2"]).await;
    message(&broker, "A", json!({"type": "unsubscribe", "topics": ["room1"]})).await;
    assert!(store.members("room1").await.unwrap().is_empty());
    assert_eq!(store.members("room2").await.unwrap(), set(&["A"]));
}

#[tokio::test]
async fn test_publish_forwards_whole_message_to_subscribers_only() {
    let (broker, _, transport) = setup(10);
    subscribe(&broker, "A", &["t"]).await;
    subscribe(&broker, "B", &["t"]).await;
    subscribe(&broker, "C", &["other"]).await;

    let publish = json!({"type": "publish", "topic": "t", "body": "x"});
    message(&broker, "P", publish.clone()).await;

    assert_eq!(transport.delivered_to("A"), vec![publish.clone()]);
    assert_eq!(transport.delivered_to("B"), vec![publish]);
    assert!(transport.delivered_to("C").is_empty());
    assert!(transport.delivered_to("P").is_empty());
    assert_eq!(transport.total(), 2);
}

#[tokio::test]
async fn test_publisher_receives_its_own_message() {
    let (broker, _, transport) = setup(10);
    subscribe(&broker, "A", &["room1"]).await;
    subscribe(&broker, "B", &["room1"]).await;

    message(&broker, "A", json!({"type": "publish", "topic": "room1", "msg": "hi"})).await;

    let expected = json!({"type": "publish", "topic": "room1", "msg": "hi"});
    assert_eq!(transport.delivered_to("A"), vec![expected.clone()]);
    assert_eq!(transport.delivered_to("B"), vec![expected]);
}

#[tokio::test]
async fn test_publish_without_topic_or_subscribers_delivers_nothing() {
    let (broker, _, transport) = setup(10);
    subscribe(&broker, "A", &["room1"]).await;

    message(&broker, "A", json!({"type": "publish", "msg": "lost"})).await;
    message(&broker, "A", json!({"type": "publish", "topic": "", "msg": "lost"})).await;
    message(&broker, "A", json!({"type": "publish", "topic": "empty", "msg": "lost"})).await;

    assert_eq!(transport.total(), 0);
}

#[tokio::test]
async fn test_ping_answers_sender_only() {
    let (broker, store, transport) = setup(10);
    subscribe(&broker, "A", &["room1"]).await;
    subscribe(&broker, "C", &["room1"]).await;

    message(&broker, "C", json!({"type": "ping"})).await;

    assert_eq!(transport.delivered_to("C"), vec![json!({"type": "pong"})]);
    assert_eq!(transport.total(), 1);
    assert_eq!(store.members("room1").await.unwrap(), set(&["A", "C"]));
}

#[tokio::test]
async fn test_malformed_messages_are_ignored() {
    let (broker, store, transport) = setup(10);
    for body in ["garbage", r#"{"type":"shout"}"#, r#"{"topics":["room1"]}"#] {
        let response = broker
            .handle_event(RelayEvent::Message {
                connection_id: "A".into(),
                body: Some(body.into()),
            })
            .await;
        assert!(response.is_success());
    }
    let response = broker
        .handle_event(RelayEvent::Message {
            connection_id: "A".into(),
            body: None,
        })
        .await;
    assert!(response.is_success());

    assert_eq!(transport.total(), 0);
    assert!(store.scan(None, 10).await.unwrap().topics.is_empty());
}

#[tokio::test]
async fn test_disconnect_removes_from_every_topic() {
    let (broker, store, transport) = setup(10);
    subscribe(&broker, "A", &["room1", "room2"]).await;
    subscribe(&broker, "B", &["room1"]).await;

    let response = broker
        .handle_event(RelayEvent::Disconnect {
            connection_id: "A".into(),
        })
        .await;
    assert!(response.is_success());

    assert_eq!(store.members("room1").await.unwrap(), set(&["B"]));
    assert!(store.members("room2").await.unwrap().is_empty());

    message(&broker, "B", json!({"type": "publish", "topic": "room1"})).await;
    message(&broker, "B", json!({"type": "publish", "topic": "room2"})).await;
    assert!(transport.delivered_to("A").is_empty());
    assert_eq!(transport.delivered_to("B").len(), 1);
}

#[tokio::test]
async fn test_disconnect_scans_across_pages() {
    let (broker, store, _) = setup(1);
    let topics: Vec<String> = (0..7).map(|i| format!("topic-{i}")).collect();
    let names: Vec<&str> = topics.iter().map(String::as_str).collect();
    subscribe(&broker, "A", &names).await;
    subscribe(&broker, "B", &["topic-3"]).await;

    broker
        .handle_event(RelayEvent::Disconnect {
            connection_id: "A".into(),
        })
        .await;

    let remaining: Vec<Topic> = broker
        .registry()
        .list_all_topics()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "topic-3");
    assert_eq!(store.members("topic-3").await.unwrap(), set(&["B"]));
}

#[tokio::test]
async fn test_topic_scan_is_restartable() {
    let (broker, _, _) = setup(2);
    subscribe(&broker, "A", &["a", "b", "c"]).await;

    let first: Vec<Topic> = broker.registry().list_all_topics().try_collect().await.unwrap();
    let second: Vec<Topic> = broker.registry().list_all_topics().try_collect().await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_connect_changes_nothing() {
    let (broker, store, transport) = setup(10);
    let response = broker
        .handle_event(RelayEvent::Connect {
            connection_id: "A".into(),
        })
        .await;
    assert!(response.is_success());
    assert_eq!(transport.total(), 0);
    assert!(store.scan(None, 10).await.unwrap().topics.is_empty());
}

#[tokio::test]
async fn test_stale_delivery_removes_subscriber_everywhere() {
    let (broker, store, transport) = setup(10);
    subscribe(&broker, "A", &["room1"]).await;
    subscribe(&broker, "C", &["room1", "room2"]).await;
    transport.mark_gone("C");

    message(&broker, "A", json!({"type": "publish", "topic": "room1"})).await;

    assert_eq!(transport.delivered_to("A").len(), 1);
    assert_eq!(store.members("room1").await.unwrap(), set(&["A"]));
    assert!(store.members("room2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_pong_cleans_up_sender() {
    let (broker, store, transport) = setup(10);
    subscribe(&broker, "C", &["room1"]).await;
    transport.mark_gone("C");

    message(&broker, "C", json!({"type": "ping"})).await;

    assert!(store.members("room1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_delivery_does_not_block_others() {
    let (broker, store, transport) = setup(10);
    for id in ["A", "B", "C"] {
        subscribe(&broker, id, &["room1"]).await;
    }
    transport.mark_failing("B");

    message(&broker, "A", json!({"type": "publish", "topic": "room1"})).await;

    assert_eq!(transport.delivered_to("A").len(), 1);
    assert_eq!(transport.delivered_to("C").len(), 1);
    // a transient failure is not a disconnect
    assert_eq!(store.members("room1").await.unwrap(), set(&["A", "B", "C"]));
}

#[tokio::test]
async fn test_registry_failure_is_swallowed() {
    let (broker, store, transport) = setup(10);
    subscribe(&broker, "A", &["room1"]).await;
    store.set_failing(true);

    subscribe(&broker, "B", &["room1"]).await;
    message(&broker, "A", json!({"type": "publish", "topic": "room1"})).await;

    store.set_failing(false);
    assert_eq!(transport.total(), 0);
    assert_eq!(store.members("room1").await.unwrap(), set(&["A"]));
}

#[tokio::test]
async fn test_disconnect_with_broken_registry_reports_internal_error() {
    let (broker, store, _) = setup(10);
    subscribe(&broker, "A", &["room1"]).await;
    store.set_failing(true);

    let response = broker
        .handle_event(RelayEvent::Disconnect {
            connection_id: "A".into(),
        })
        .await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.unwrap().contains("topic scan failed"));
}

#[tokio::test]
async fn test_unrouted_event_is_acknowledged() {
    let (broker, _, transport) = setup(10);
    let response = broker
        .handle_event(RelayEvent::from_route("$custom", "A", Some("{}".into())))
        .await;
    assert!(response.is_success());
    assert_eq!(transport.total(), 0);
}

/// Memory store that refuses writes to one topic.
struct RejectingStore {
    inner: MemoryStore,
    rejected: &'static str,
}

#[async_trait]
impl TopicStore for RejectingStore {
    async fn add(&self, topic: &str, subscriber: &str) -> Result<(), RegistryError> {
        if topic == self.rejected {
            return Err(RegistryError::Unavailable(format!("{topic} is read-only")));
        }
        self.inner.add(topic, subscriber).await
    }

    async fn remove(&self, topic: &str, subscriber: &str) -> Result<(), RegistryError> {
        self.inner.remove(topic, subscriber).await
    }

    async fn members(&self, topic: &str) -> Result<HashSet<String>, RegistryError> {
        self.inner.members(topic).await
    }

    async fn scan(
        &self,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<TopicPage, RegistryError> {
        self.inner.scan(start_after, limit).await
    }
}

#[tokio::test]
async fn test_failed_topic_does_not_block_other_subscriptions() {
    let inner = MemoryStore::new();
    let store = RejectingStore {
        inner: inner.clone(),
        rejected: "bad",
    };
    let transport = Arc::new(RecordingTransport::default());
    let broker = Broker::new(Arc::new(store), transport, 10);

    subscribe(&broker, "A", &["bad", "good"]).await;

    assert_eq!(inner.members("good").await.unwrap(), set(&["A"]));
    assert!(inner.members("bad").await.unwrap().is_empty());
}

/// Each delivery takes `delay` before succeeding.
struct SlowTransport {
    delay: Duration,
    delivered: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for SlowTransport {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        _data: String,
    ) -> Result<(), DeliveryError> {
        tokio::time::sleep(self.delay).await;
        self.delivered.lock().unwrap().push(connection_id.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn test_publish_deliveries_run_concurrently() {
    let delay = Duration::from_millis(200);
    let transport = Arc::new(SlowTransport {
        delay,
        delivered: Mutex::new(Vec::new()),
    });
    let broker = Broker::new(Arc::new(MemoryStore::new()), transport.clone(), 10);

    let ids = ["A", "B", "C", "D", "E"];
    for id in ids {
        subscribe(&broker, id, &["room1"]).await;
    }

    let started = Instant::now();
    message(
        &broker,
        "A",
        json!({"type": "publish", "topic": "room1", "msg": "hi"}),
    )
    .await;
    let elapsed = started.elapsed();

    assert_eq!(transport.delivered.lock().unwrap().len(), ids.len());
    // sequential delivery would take five delays
    assert!(elapsed < delay * 3, "publish took {elapsed:?}");
}
