//! Transport-level events and the status the relay reports back for them.
//!
//! Route keys follow the `$connect` / `$disconnect` / `$default` convention
//! used by WebSocket gateways; any other key becomes `Unrouted` and is
//! acknowledged without effect.

pub const ROUTE_CONNECT: &str = "$connect";
pub const ROUTE_DISCONNECT: &str = "$disconnect";
pub const ROUTE_DEFAULT: &str = "$default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Connect {
        connection_id: String,
    },
    Disconnect {
        connection_id: String,
    },
    /// An inbound frame. A missing body is handled as `{}`.
    Message {
        connection_id: String,
        body: Option<String>,
    },
    Unrouted {
        route: String,
        connection_id: String,
    },
}

impl RelayEvent {
    pub fn from_route(
        route: &str,
        connection_id: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        let connection_id = connection_id.into();
        match route {
            ROUTE_CONNECT => Self::Connect { connection_id },
            ROUTE_DISCONNECT => Self::Disconnect { connection_id },
            ROUTE_DEFAULT => Self::Message {
                connection_id,
                body,
            },
            other => Self::Unrouted {
                route: other.to_string(),
                connection_id,
            },
        }
    }

    pub fn connection_id(&self) -> &str {
        match self {
            Self::Connect { connection_id }
            | Self::Disconnect { connection_id }
            | Self::Message { connection_id, .. }
            | Self::Unrouted { connection_id, .. } => connection_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventResponse {
    pub status_code: u16,
    pub body: Option<String>,
}

impl EventResponse {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            body: None,
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
