//! Inventory export: hosts rendered into the collector inventory format
//!
//! One line per host: the bare hostname first, then space-separated
//! `key="value"` tokens for the connection coordinates, the IPMI triple
//! when complete, and every extra-info pair with whitespace-normalized
//! keys.

use std::fmt::Write as _;
use std::io::Write as _;

use rackdb_model::{Host, normalize_key};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ReportError;

/// Render hosts into the inventory text format.
#[must_use]
pub fn render_inventory(hosts: &[Host]) -> String {
    let mut out = String::new();
    for host in hosts {
        let ssh_addr = if host.ssh_address.is_empty() {
            &host.hostname
        } else {
            &host.ssh_address
        };
        let _ = write!(
            out,
            "{} ansible_connection=\"smart\" ansible_host=\"{}\" ansible_port={} ansible_user=\"{}\"",
            host.hostname, ssh_addr, host.ssh_port, host.ssh_user
        );
        if host.has_ipmi() {
            let _ = write!(
                out,
                " ipmi_addr=\"{}\" ipmi_user=\"{}\" ipmi_pass=\"{}\"",
                host.ipmi_address, host.ipmi_user, host.ipmi_password
            );
        }
        for (key, value) in &host.extra_info {
            let _ = write!(out, " {}=\"{}\"", normalize_key(key), render_value(value));
        }
        out.push('\n');
    }
    out
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write the rendered inventory into a temporary file. The file is
/// removed when the returned handle is dropped.
pub fn write_inventory_file(hosts: &[Host]) -> Result<NamedTempFile, ReportError> {
    let mut file = NamedTempFile::new()?;
    file.write_all(render_inventory(hosts).as_bytes())?;
    file.flush()?;
    debug!(path = %file.path().display(), hosts = hosts.len(), "exported inventory");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_carries_connection_coordinates() {
        let mut host = Host::new();
        host.hostname = "node-1".to_string();
        host.ssh_address = "10.0.0.5".to_string();
        host.ssh_port = 2222;
        host.ssh_user = "ops".to_string();
        let line = render_inventory(std::slice::from_ref(&host));
        assert_eq!(
            line,
            "node-1 ansible_connection=\"smart\" ansible_host=\"10.0.0.5\" ansible_port=2222 ansible_user=\"ops\"\n"
        );
    }

    #[test]
    fn hostname_stands_in_for_missing_ssh_address() {
        let mut host = Host::new();
        host.hostname = "node-1".to_string();
        let line = render_inventory(std::slice::from_ref(&host));
        assert!(line.contains("ansible_host=\"node-1\""));
    }

    #[test]
    fn ipmi_tokens_require_the_complete_triple() {
        let mut host = Host::new();
        host.hostname = "node-1".to_string();
        host.ipmi_address = "10.1.0.5".to_string();
        assert!(!render_inventory(std::slice::from_ref(&host)).contains("ipmi_addr"));

        host.ipmi_user = "admin".to_string();
        host.ipmi_password = "secret".to_string();
        let line = render_inventory(std::slice::from_ref(&host));
        assert!(line.contains("ipmi_addr=\"10.1.0.5\" ipmi_user=\"admin\" ipmi_pass=\"secret\""));
    }

    #[test]
    fn extra_info_keys_are_normalized_and_quoted() {
        let mut host = Host::new();
        host.hostname = "node-1".to_string();
        host.extra_info
            .insert("rack slot".to_string(), serde_json::json!("A-12"));
        host.extra_info
            .insert("weight".to_string(), serde_json::json!(3));
        let line = render_inventory(std::slice::from_ref(&host));
        assert!(line.contains(" rack_slot=\"A-12\""));
        assert!(line.contains(" weight=\"3\""));
    }

    #[test]
    fn one_line_per_host() {
        let mut a = Host::new();
        a.hostname = "a".to_string();
        let mut b = Host::new();
        b.hostname = "b".to_string();
        let rendered = render_inventory(&[a, b]);
        assert_eq!(rendered.lines().count(), 2);
    }
}
