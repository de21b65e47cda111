//! TTL-backed key/value storage for ephemeral room and participant state.

/// In-memory TTL backend.
pub mod memory;
/// Pin-keyed party session operations.
pub mod party_store;
/// Pin-keyed room state operations.
pub mod room_store;
/// Participant session operations.
pub mod session_store;

use std::{error::Error, time::Duration};

use futures::future::BoxFuture;
use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by storage backends regardless of the underlying engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or failed mid-operation.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Human-readable failure context.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A stored value could not be encoded or decoded.
    #[error("codec failure for key `{key}`")]
    Codec {
        /// Key whose value failed to round-trip.
        key: String,
        /// Underlying serde failure.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a codec error for the given key.
    pub fn codec(key: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Codec {
            key: key.into(),
            source,
        }
    }
}

/// Abstraction over an expiring key/value store (Redis-shaped).
///
/// Values are JSON strings; every `set` refreshes the key's TTL. The engine
/// only ever needs get/set/delete plus a TTL bump, so backends stay trivial.
pub trait KvStore: Send + Sync {
    /// Fetch a value, `None` when absent or expired.
    fn get(&self, key: &str) -> BoxFuture<'static, StoreResult<Option<String>>>;
    /// Store a value with a fresh TTL.
    fn set(&self, key: &str, value: String, ttl: Duration) -> BoxFuture<'static, StoreResult<()>>;
    /// Remove a key; absent keys are not an error.
    fn delete(&self, key: &str) -> BoxFuture<'static, StoreResult<()>>;
    /// Refresh a key's TTL without touching the value. Returns whether the
    /// key existed.
    fn expire(&self, key: &str, ttl: Duration) -> BoxFuture<'static, StoreResult<bool>>;
}
