//! Storage facade: the only place adapter selection is decided

use tracing::info;

use crate::config::StorageConfig;
use crate::error::ConfigError;
use crate::etcd::EtcdStorage;
use crate::traits::Storage;

/// Construct and open the adapter named by `config`, returning the uniform
/// [`Storage`] capability.
pub async fn open_storage(config: &StorageConfig) -> Result<Box<dyn Storage>, ConfigError> {
    match config.adapter.as_str() {
        "etcd" => {
            let storage = EtcdStorage::open(&config.etcd).await?;
            info!(adapter = "etcd", "storage opened");
            Ok(Box::new(storage))
        }
        other => Err(ConfigError::UnknownAdapter(other.to_string())),
    }
}
