//! rackdb-inventory: business rules over host storage
//!
//! Thin validation layer in front of the [`Storage`] capability. The one
//! non-trivial policy lives in [`Inventory::update`]: every field the
//! caller leaves empty is filled from the currently stored record, so a
//! partial update never silently discards data.

pub mod error;

use rackdb_model::Host;
use rackdb_storage::{Storage, StorageError};
use tracing::debug;

pub use error::InventoryError;

const COMMENT_KEY: &str = "comment";

/// Host inventory service
pub struct Inventory {
    storage: Box<dyn Storage>,
}

impl Inventory {
    /// Wrap an opened storage backend.
    #[must_use]
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Register a new host. Fails with [`StorageError::AlreadyExists`]
    /// (wrapped) if the hostname is taken.
    pub async fn add(&self, mut host: Host) -> Result<(), InventoryError> {
        validate_ssh_address(&host)?;
        host.extra_info
            .entry(COMMENT_KEY.to_string())
            .or_insert_with(|| serde_json::Value::String(String::new()));
        debug!(hostname = %host.hostname, "adding host");
        self.storage.create_host(host).await?;
        Ok(())
    }

    /// Fetch one host by hostname.
    pub async fn get(&self, id: &str) -> Result<Host, InventoryError> {
        Ok(self.storage.get_host(id).await?)
    }

    /// List every registered host.
    pub async fn list(&self) -> Result<Vec<Host>, InventoryError> {
        Ok(self.storage.list_hosts().await?)
    }

    /// Apply a partial update. Empty fields of `host` are filled from the
    /// stored record before persisting; the GUID always survives from the
    /// stored record. A lost compare-and-swap race surfaces as a hard
    /// error and is never retried here.
    pub async fn update(&self, host: Host) -> Result<(), InventoryError> {
        validate_ssh_address(&host)?;
        let hostname = host.hostname.clone();
        debug!(hostname = %hostname, "updating host");
        self.storage
            .update_host(&hostname, Box::new(move |current| Ok(merge_hosts(host, current))))
            .await?;
        Ok(())
    }

    /// Remove a host by hostname.
    pub async fn delete(&self, id: &str) -> Result<(), InventoryError> {
        debug!(hostname = %id, "deleting host");
        self.storage.delete_host(id).await?;
        Ok(())
    }

    /// Release the underlying storage connection.
    pub async fn close(&mut self) -> Result<(), InventoryError> {
        self.storage.close().await?;
        Ok(())
    }
}

fn validate_ssh_address(host: &Host) -> Result<(), InventoryError> {
    if !host.ssh_address.is_empty() && host.ssh_address.parse::<std::net::IpAddr>().is_err() {
        return Err(InventoryError::InvalidAddress(host.ssh_address.clone()));
    }
    Ok(())
}

/// Field-fill-from-current merge policy for partial updates.
fn merge_hosts(mut next: Host, mut current: Host) -> Host {
    next.guid = current.guid.clone();
    if next.ssh_address.is_empty() {
        next.ssh_address = current.ssh_address.clone();
    }
    if next.ssh_port == 0 {
        next.ssh_port = current.ssh_port;
    }
    if next.ssh_user.is_empty() {
        next.ssh_user = current.ssh_user.clone();
    }
    if next.ipmi_address.is_empty() {
        next.ipmi_address = current.ipmi_address.clone();
    }
    if next.ipmi_user.is_empty() {
        next.ipmi_user = current.ipmi_user.clone();
    }
    if next.ipmi_password.is_empty() {
        next.ipmi_password = current.ipmi_password.clone();
    }
    let current_comment = current
        .extra_info
        .entry(COMMENT_KEY.to_string())
        .or_insert_with(|| serde_json::Value::String(String::new()))
        .clone();
    if next.extra_info.is_empty() {
        next.extra_info = current.extra_info;
    } else if !next.extra_info.contains_key(COMMENT_KEY) {
        next.extra_info.insert(COMMENT_KEY.to_string(), current_comment);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Host {
        let mut host = Host::new();
        host.guid = "a6a9d5b2-6b6f-4f3a-9f2e-0c5b8e7d1a23".to_string();
        host.hostname = "node-1".to_string();
        host.ssh_address = "10.0.0.5".to_string();
        host.ssh_port = 22;
        host.ssh_user = "ops".to_string();
        host.ipmi_address = "10.1.0.5".to_string();
        host.extra_info
            .insert("comment".to_string(), serde_json::json!("lab box"));
        host
    }

    #[test]
    fn merge_fills_empty_fields_from_current() {
        let mut partial = Host::new();
        partial.hostname = "node-1".to_string();
        partial.ssh_port = 2222;

        let merged = merge_hosts(partial, stored());
        assert_eq!(merged.ssh_port, 2222);
        assert_eq!(merged.ssh_address, "10.0.0.5");
        assert_eq!(merged.ipmi_address, "10.1.0.5");
        assert_eq!(merged.guid, "a6a9d5b2-6b6f-4f3a-9f2e-0c5b8e7d1a23");
    }

    #[test]
    fn merge_keeps_callers_non_empty_fields() {
        let mut partial = Host::new();
        partial.hostname = "node-1".to_string();
        partial.ssh_address = "10.0.0.99".to_string();

        let merged = merge_hosts(partial, stored());
        assert_eq!(merged.ssh_address, "10.0.0.99");
        assert_eq!(merged.ssh_user, "ops");
    }

    #[test]
    fn merge_carries_comment_when_caller_omits_it() {
        let mut partial = Host::new();
        partial.hostname = "node-1".to_string();
        partial
            .extra_info
            .insert("department".to_string(), serde_json::json!("storage"));

        let merged = merge_hosts(partial, stored());
        assert_eq!(
            merged.extra_info.get("comment"),
            Some(&serde_json::json!("lab box"))
        );
        assert_eq!(
            merged.extra_info.get("department"),
            Some(&serde_json::json!("storage"))
        );
    }

    #[test]
    fn merge_adopts_whole_extra_info_when_caller_sends_none() {
        let mut partial = Host::new();
        partial.hostname = "node-1".to_string();

        let merged = merge_hosts(partial, stored());
        assert_eq!(
            merged.extra_info.get("comment"),
            Some(&serde_json::json!("lab box"))
        );
    }

    #[test]
    fn validate_rejects_non_ip_literal() {
        let mut host = Host::new();
        host.ssh_address = "not-an-ip".to_string();
        assert!(matches!(
            validate_ssh_address(&host),
            Err(InventoryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn validate_accepts_empty_and_v6_addresses() {
        let mut host = Host::new();
        assert!(validate_ssh_address(&host).is_ok());
        host.ssh_address = "fd00::1".to_string();
        assert!(validate_ssh_address(&host).is_ok());
    }
}
