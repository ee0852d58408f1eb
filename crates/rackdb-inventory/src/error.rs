//! Error types for rackdb-inventory

use rackdb_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the inventory service
#[derive(Error, Debug)]
pub enum InventoryError {
    /// SSH address was supplied but is not a valid IP literal
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    /// Underlying storage failure, passed through unchanged
    #[error(transparent)]
    Storage(#[from] StorageError),
}
