//! Storage configuration types

use serde::{Deserialize, Serialize};

/// Selects and parameterizes a storage adapter.
///
/// The adapter name decides which backend section applies; everything
/// above the facade is adapter-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Adapter name (currently only `etcd`)
    #[serde(default = "default_adapter")]
    pub adapter: String,
    /// etcd adapter parameters
    #[serde(default)]
    pub etcd: EtcdConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
            etcd: EtcdConfig::default(),
        }
    }
}

fn default_adapter() -> String {
    "etcd".to_string()
}

/// Connection parameters for the etcd backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtcdConfig {
    /// Cluster endpoints, `host:port`
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    /// Optional authentication user
    #[serde(default)]
    pub user: Option<String>,
    /// Optional authentication password
    #[serde(default)]
    pub password: Option<String>,
    /// Optional TLS material
    #[serde(default, rename = "ssl")]
    pub tls: Option<TlsConfig>,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            user: None,
            password: None,
            tls: None,
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["localhost:2379".to_string()]
}

/// TLS options for the etcd connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Enable TLS for the connection
    #[serde(default)]
    pub enabled: bool,
    /// Expected server name for certificate verification
    #[serde(default)]
    pub server_name: Option<String>,
    /// Path to the CA certificate (PEM)
    #[serde(default)]
    pub ca_cert: Option<String>,
    /// Path to the client certificate (PEM)
    #[serde(default)]
    pub cert: Option<String>,
    /// Path to the client private key (PEM)
    #[serde(default)]
    pub key: Option<String>,
}
