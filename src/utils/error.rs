//! The `error` module defines the error types used within `sigrelay`.
//!
//! Most failures in the relay are logged and swallowed at the point where they
//! happen; these types exist so the store and transport layers can say *what*
//! went wrong before the caller decides to ignore it.

use thiserror::Error;

/// Failure reported by a topic registry backend.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The underlying sled database failed.
    #[error("registry backend error: {0}")]
    Backend(#[from] sled::Error),

    /// A stored subscriber set could not be encoded or decoded.
    #[error("registry codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The store refused the operation (used by the in-memory store).
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by the downstream delivery transport.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The target connection no longer exists.
    #[error("connection is gone")]
    Gone,

    /// Any other delivery failure.
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Unexpected fault while handling a transport event.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("topic scan failed: {0}")]
    Scan(#[source] RegistryError),

    #[error("failed to open registry: {0}")]
    Registry(#[source] RegistryError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
