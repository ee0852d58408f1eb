//! Configuration loading for the rackdb CLI

use std::path::{Path, PathBuf};

use rackdb_storage::StorageConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the rackdb CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage adapter selection and backend parameters
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from the default paths or fall back to defaults.
    pub fn load_default() -> eyre::Result<Self> {
        if let Ok(path) = std::env::var("RACKDB_CONFIG") {
            return Self::load(Path::new(&path));
        }

        let paths = [
            PathBuf::from("rackdb.toml"),
            PathBuf::from("/etc/rackdb/rackdb.toml"),
            dirs::config_dir()
                .map(|p| p.join("rackdb/rackdb.toml"))
                .unwrap_or_default(),
        ];

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::warn!("no config file found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage.adapter, "etcd");
    }

    #[test]
    fn storage_section_is_honored() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            adapter = "etcd"

            [storage.etcd]
            endpoints = ["etcd-1:2379"]
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.etcd.endpoints, vec!["etcd-1:2379".to_string()]);
    }
}
