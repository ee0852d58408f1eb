//! etcd backend adapter
//!
//! Maps host CRUD onto etcd v3 transactions. Create-uniqueness rides on
//! `create_revision == 0`, updates on `mod_revision` compare-and-swap.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{
    Certificate, Client, Compare, CompareOp, ConnectOptions, GetOptions, Identity, TlsOptions,
    Txn, TxnOp,
};
use rackdb_model::Host;
use tokio::time::timeout;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::EtcdConfig;
use crate::error::{ConfigError, StorageError};
use crate::traits::{Storage, UpdateFn};

/// Logical namespace shared by every key this application writes, so an
/// etcd cluster can be shared with unrelated applications.
const NAMESPACE: &str = "/rackdb/v1";

const HOST_PREFIX: &str = "host";

/// Fixed deadline applied to every storage operation.
pub const STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

const DIAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Canonical key for a host record: `<namespace>/host/<hostname>`.
pub(crate) fn canonical_key(id: &str) -> String {
    format!("{NAMESPACE}/{HOST_PREFIX}/{id}")
}

/// Prefix under which every host record lives.
pub(crate) fn host_scan_prefix() -> String {
    format!("{NAMESPACE}/{HOST_PREFIX}/")
}

/// Replace an invalid GUID with a freshly generated one. The stored record
/// always carries a valid identifier after a successful write.
pub(crate) fn ensure_guid(mut host: Host) -> Host {
    if Uuid::parse_str(&host.guid).is_err() {
        host.guid = Uuid::new_v4().to_string();
    }
    host
}

async fn with_deadline<T, F>(fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, etcd_client::Error>>,
{
    match timeout(STORAGE_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => Err(StorageError::Timeout(STORAGE_TIMEOUT)),
    }
}

/// Host storage on an etcd cluster
pub struct EtcdStorage {
    client: Option<Client>,
}

impl std::fmt::Debug for EtcdStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdStorage")
            .field("client", &self.client.as_ref().map(|_| "Client"))
            .finish()
    }
}

impl EtcdStorage {
    /// Connect to the cluster described by `config`.
    pub async fn open(config: &EtcdConfig) -> Result<Self, ConfigError> {
        let mut options = ConnectOptions::new().with_connect_timeout(DIAL_TIMEOUT);
        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            options = options.with_user(user.as_str(), password.as_str());
        }
        if let Some(tls) = &config.tls {
            if tls.enabled {
                options = options.with_tls(build_tls_options(tls)?);
            }
        }
        let client = Client::connect(&config.endpoints, Some(options))
            .await
            .map_err(StorageError::from)?;
        debug!(endpoints = ?config.endpoints, "connected to etcd");
        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self) -> Result<Client, StorageError> {
        self.client.clone().ok_or(StorageError::Closed)
    }
}

fn build_tls_options(tls: &crate::config::TlsConfig) -> Result<TlsOptions, ConfigError> {
    let mut options = TlsOptions::new();
    if let Some(server_name) = &tls.server_name {
        options = options.domain_name(server_name.as_str());
    }
    if let Some(path) = &tls.ca_cert {
        let pem = read_pem(path)?;
        options = options.ca_certificate(Certificate::from_pem(pem));
    }
    if let (Some(cert_path), Some(key_path)) = (&tls.cert, &tls.key) {
        let cert = read_pem(cert_path)?;
        let key = read_pem(key_path)?;
        options = options.identity(Identity::from_pem(cert, key));
    }
    Ok(options)
}

fn read_pem(path: &str) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::TlsMaterial {
        path: path.to_string(),
        source,
    })
}

#[async_trait]
impl Storage for EtcdStorage {
    async fn create_host(&self, host: Host) -> Result<(), StorageError> {
        let host = ensure_guid(host);
        let key = canonical_key(&host.hostname);
        let value = serde_json::to_vec(&host)?;
        let mut client = self.client()?;
        let txn = Txn::new()
            .when(vec![Compare::create_revision(
                key.clone(),
                CompareOp::Equal,
                0,
            )])
            .and_then(vec![TxnOp::put(key.clone(), value, None)]);
        let resp = with_deadline(client.txn(txn)).await.inspect_err(|err| {
            error!(key = %key, error = %err, "create transaction failed");
        })?;
        if !resp.succeeded() {
            return Err(StorageError::AlreadyExists);
        }
        debug!(key = %key, guid = %host.guid, "created host");
        Ok(())
    }

    async fn get_host(&self, id: &str) -> Result<Host, StorageError> {
        let key = canonical_key(id);
        let mut client = self.client()?;
        let resp = with_deadline(client.get(key.clone(), None))
            .await
            .inspect_err(|err| {
                error!(key = %key, error = %err, "point read failed");
            })?;
        let Some(kv) = resp.kvs().first() else {
            return Err(StorageError::NotFound);
        };
        let host: Host = serde_json::from_slice(kv.value())?;
        debug!(key = %key, "retrieved host");
        Ok(host)
    }

    async fn update_host(&self, id: &str, update: UpdateFn) -> Result<(), StorageError> {
        let key = canonical_key(id);
        let mut client = self.client()?;

        let resp = with_deadline(client.get(key.clone(), None)).await?;
        let (current, mod_revision) = match resp.kvs().first() {
            Some(kv) => (serde_json::from_slice(kv.value())?, kv.mod_revision()),
            None => (Host::new(), 0),
        };

        let updated = ensure_guid(update(current)?);
        let value = serde_json::to_vec(&updated)?;

        // The write lands only if nobody else touched the key since the
        // read above. The loser of the race gets a hard error.
        let txn = Txn::new()
            .when(vec![Compare::mod_revision(
                key.clone(),
                CompareOp::Equal,
                mod_revision,
            )])
            .and_then(vec![TxnOp::put(key.clone(), value, None)]);
        let resp = with_deadline(client.txn(txn)).await.inspect_err(|err| {
            error!(key = %key, error = %err, "update transaction failed");
        })?;
        if !resp.succeeded() {
            return Err(StorageError::ConcurrentConflict(key));
        }
        debug!(key = %key, "updated host");
        Ok(())
    }

    async fn delete_host(&self, id: &str) -> Result<(), StorageError> {
        let key = canonical_key(id);
        let mut client = self.client()?;
        let resp = with_deadline(client.delete(key.clone(), None))
            .await
            .inspect_err(|err| {
                error!(key = %key, error = %err, "delete failed");
            })?;
        if resp.deleted() == 0 {
            return Err(StorageError::NotFound);
        }
        debug!(key = %key, "deleted host");
        Ok(())
    }

    async fn list_hosts(&self) -> Result<Vec<Host>, StorageError> {
        let prefix = host_scan_prefix();
        let mut client = self.client()?;
        let resp = with_deadline(client.get(
            prefix.clone(),
            Some(GetOptions::new().with_prefix()),
        ))
        .await
        .inspect_err(|err| {
            error!(prefix = %prefix, error = %err, "prefix scan failed");
        })?;
        let mut hosts = Vec::with_capacity(resp.kvs().len());
        for kv in resp.kvs() {
            let host: Host = serde_json::from_slice(kv.value())?;
            hosts.push(host);
        }
        debug!(prefix = %prefix, count = hosts.len(), "listed hosts");
        Ok(hosts)
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if self.client.take().is_none() {
            return Err(StorageError::Closed);
        }
        debug!("released etcd connection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_is_namespaced() {
        assert_eq!(canonical_key("node-1"), "/rackdb/v1/host/node-1");
        assert!(canonical_key("node-1").starts_with(&host_scan_prefix()));
    }

    #[test]
    fn ensure_guid_replaces_invalid_identifier() {
        let mut host = Host::new();
        host.guid = "not-a-guid".to_string();
        let host = ensure_guid(host);
        assert!(Uuid::parse_str(&host.guid).is_ok());
        assert_ne!(host.guid, "not-a-guid");
    }

    #[test]
    fn ensure_guid_generates_when_absent() {
        let host = ensure_guid(Host::new());
        assert!(Uuid::parse_str(&host.guid).is_ok());
    }

    #[test]
    fn ensure_guid_keeps_valid_identifier() {
        let mut host = Host::new();
        host.guid = "a6a9d5b2-6b6f-4f3a-9f2e-0c5b8e7d1a23".to_string();
        let host = ensure_guid(host);
        assert_eq!(host.guid, "a6a9d5b2-6b6f-4f3a-9f2e-0c5b8e7d1a23");
    }
}
