//! Signaling protocol messages
//!
//! Clients send one JSON object per frame with a `type` field:
//!
//! - `subscribe` / `unsubscribe`: `topics` is a list of topic names
//! - `publish`: `topic` names the target; every other field is opaque and the
//!   whole object is forwarded verbatim to subscribers
//! - `ping`: answered with `{"type":"pong"}`
//!
//! Anything that does not fit one of these shapes is dropped without reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum SignalingMessage {
    Subscribe { topics: Vec<String> },
    Unsubscribe { topics: Vec<String> },
    /// `topic` is `None` when the field is missing or empty. `message` is the
    /// original object, `type` field included.
    Publish { topic: Option<String>, message: Value },
    Ping,
}

/// Shape check only; the original `Value` is kept for forwarding.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Envelope {
    Subscribe {
        #[serde(default)]
        topics: Option<Vec<String>>,
    },
    Unsubscribe {
        #[serde(default)]
        topics: Option<Vec<String>>,
    },
    Publish {
        #[serde(default)]
        topic: Option<String>,
    },
    Ping {},
}

impl SignalingMessage {
    /// Parse a raw frame body. Returns `None` for invalid JSON or an
    /// unrecognized message.
    pub fn parse(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Option<Self> {
        let envelope = Envelope::deserialize(&value).ok()?;
        let message = match envelope {
            Envelope::Subscribe { topics } => Self::Subscribe {
                topics: named(topics),
            },
            Envelope::Unsubscribe { topics } => Self::Unsubscribe {
                topics: named(topics),
            },
            Envelope::Publish { topic } => Self::Publish {
                topic: topic.filter(|topic| !topic.is_empty()),
                message: value,
            },
            Envelope::Ping {} => Self::Ping,
        };
        Some(message)
    }
}

/// Empty names can never be published to, so they are dropped.
fn named(topics: Option<Vec<String>>) -> Vec<String> {
    topics
        .unwrap_or_default()
        .into_iter()
        .filter(|topic| !topic.is_empty())
        .collect()
}

/// Messages the relay originates itself.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Pong,
}
