//! Error types for rackdb-storage

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Requested host key does not exist
    #[error("resource not found")]
    NotFound,

    /// Create attempted against an existing key
    #[error("resource already exists")]
    AlreadyExists,

    /// Optimistic-concurrency compare-and-swap lost the race
    #[error("could not update key '{0}': concurrent conflicting update happened")]
    ConcurrentConflict(String),

    /// Backend operation exceeded its fixed deadline
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// Stored document could not be decoded
    #[error("stored document could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// Connection was already released
    #[error("storage connection is closed")]
    Closed,

    /// Backend transport or server error
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<etcd_client::Error> for StorageError {
    fn from(err: etcd_client::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Errors raised while selecting and opening a storage adapter
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Adapter name is not recognized by the facade
    #[error("unknown storage adapter '{0}'")]
    UnknownAdapter(String),

    /// Adapter could not establish its backend connection
    #[error("could not open storage backend: {0}")]
    Connection(#[from] StorageError),

    /// TLS material could not be loaded
    #[error("could not load TLS material from '{path}': {source}")]
    TlsMaterial {
        path: String,
        source: std::io::Error,
    },
}
