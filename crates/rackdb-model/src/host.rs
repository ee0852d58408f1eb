//! Host entity definition

use std::collections::BTreeMap;

use comfy_table::Table;
use serde::{Deserialize, Serialize};

/// Open key/value mapping for free-form host attributes such as
/// `comment` and `department`.
pub type ExtraInfo = BTreeMap<String, serde_json::Value>;

/// Default SSH port assigned to newly created hosts.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// A managed host record.
///
/// `hostname` is the primary business key; exactly one record exists per
/// hostname in the store. `guid` is generated server-side and stays stable
/// across updates. Empty fields are omitted from the serialized document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub guid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "ssh_addr")]
    pub ssh_address: String,
    #[serde(default, skip_serializing_if = "is_zero", rename = "ssh_port")]
    pub ssh_port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh_user: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "ipmi_addr")]
    pub ipmi_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ipmi_user: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "ipmi_pass")]
    pub ipmi_password: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_info: ExtraInfo,
}

fn is_zero(port: &u16) -> bool {
    *port == 0
}

impl Host {
    /// Create an empty host with an initialized extra-info mapping and the
    /// default SSH port.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ssh_port: DEFAULT_SSH_PORT,
            extra_info: ExtraInfo::new(),
            ..Self::default()
        }
    }

    /// Whether the IPMI connection coordinates are complete enough for
    /// out-of-band operations.
    #[must_use]
    pub fn has_ipmi(&self) -> bool {
        !self.ipmi_address.is_empty() && !self.ipmi_user.is_empty() && !self.ipmi_password.is_empty()
    }
}

/// Normalize whitespace in an extra-info key to underscores.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

const TABLE_HEADER: [&str; 9] = [
    "GUID",
    "Hostname",
    "SSH Address",
    "SSH Port",
    "SSH User",
    "IPMI Address",
    "IPMI User",
    "IPMI Password",
    "Extra Info",
];

/// Render one or more hosts into a fixed-column table.
///
/// The IPMI password is always masked.
#[must_use]
pub fn render_host_table(hosts: &[Host]) -> String {
    let mut table = Table::new();
    table.set_header(TABLE_HEADER.to_vec());
    for host in hosts {
        let extra = serde_json::to_string(&host.extra_info)
            .unwrap_or_else(|_| "<N/A>".to_string());
        let masked = if host.ipmi_password.is_empty() {
            ""
        } else {
            "******"
        };
        table.add_row(vec![
            host.guid.clone(),
            host.hostname.clone(),
            host.ssh_address.clone(),
            host.ssh_port.to_string(),
            host.ssh_user.clone(),
            host.ipmi_address.clone(),
            host.ipmi_user.clone(),
            masked.to_string(),
            extra,
        ]);
    }
    table.to_string()
}
