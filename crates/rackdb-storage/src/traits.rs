//! Storage capability trait

use async_trait::async_trait;
use rackdb_model::Host;

use crate::error::StorageError;

/// Merge function passed to [`Storage::update_host`]. Receives the current
/// stored host (or a fresh empty host if the key is absent) and returns
/// the record to persist.
pub type UpdateFn = Box<dyn FnOnce(Host) -> Result<Host, StorageError> + Send>;

/// Uniform host CRUD capability over a versioned key-value backend.
///
/// All operations run under a fixed per-call deadline. None of them retry
/// on conflict; a lost compare-and-swap race is returned to the caller as
/// [`StorageError::ConcurrentConflict`].
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Atomically create a host, failing with
    /// [`StorageError::AlreadyExists`] if its hostname is taken.
    async fn create_host(&self, host: Host) -> Result<(), StorageError>;

    /// Point read by hostname.
    async fn get_host(&self, id: &str) -> Result<Host, StorageError>;

    /// Read-modify-write with optimistic concurrency. The write succeeds
    /// only if nobody else touched the key between the read and the write.
    async fn update_host(&self, id: &str, update: UpdateFn) -> Result<(), StorageError>;

    /// Unconditional delete by hostname.
    async fn delete_host(&self, id: &str) -> Result<(), StorageError>;

    /// Scan every host under the canonical prefix. Any undecodable record
    /// aborts the whole listing.
    async fn list_hosts(&self) -> Result<Vec<Host>, StorageError>;

    /// Release the backend connection. Call exactly once; subsequent
    /// operations fail with [`StorageError::Closed`].
    async fn close(&mut self) -> Result<(), StorageError>;
}
