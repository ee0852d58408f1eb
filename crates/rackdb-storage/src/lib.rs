//! rackdb-storage: host persistence on a versioned key-value store
//!
//! Exposes the uniform [`Storage`] capability and the etcd adapter behind
//! it. Create-uniqueness and lost-update-free partial updates are enforced
//! with compare-and-swap transactions on the backend's revision counters;
//! nothing here retries a lost race on the caller's behalf.

pub mod config;
pub mod error;
pub mod etcd;
pub mod facade;
pub mod traits;

pub use config::{EtcdConfig, StorageConfig, TlsConfig};
pub use error::{ConfigError, StorageError};
pub use etcd::EtcdStorage;
pub use facade::open_storage;
pub use traits::{Storage, UpdateFn};
