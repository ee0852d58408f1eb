//! Qualification of merged fact documents into the report-ready shape

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::merge::FactDocument;

/// Typed view over the merged per-host fact map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostFacts {
    #[serde(default)]
    pub inventory_hostname: String,
    #[serde(default)]
    pub distribution: String,
    #[serde(default)]
    pub distribution_version: String,
    #[serde(default)]
    pub distribution_release: String,
    #[serde(default)]
    pub virtualization_role: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub default_ipv4: Option<DefaultIpv4Facts>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceFacts>,
    #[serde(default)]
    pub ipmi_address: String,
    #[serde(default)]
    pub ipmi_manufacturer: String,
    #[serde(default)]
    pub ipmi_model: String,
    #[serde(default)]
    pub ipmi_serial_number: String,
    #[serde(default)]
    pub ipmi_system_location: Option<SystemLocationFacts>,
    #[serde(default)]
    pub ipmi_cpus: Vec<CpuFacts>,
    #[serde(default)]
    pub ipmi_populated_dimms: u32,
    #[serde(default)]
    pub ipmi_max_dimms: u32,
    #[serde(default)]
    pub ipmi_memory_installed: String,
    #[serde(default)]
    pub ipmi_virtual_disks: Vec<DiskFacts>,
    #[serde(default)]
    pub ipmi_physical_disks: Vec<DiskFacts>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultIpv4Facts {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceFacts {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub slaves: Vec<String>,
    #[serde(default)]
    pub mac_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemLocationFacts {
    #[serde(default)]
    pub rack_name: String,
    #[serde(default)]
    pub rack_slot: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuFacts {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_clock_speed: String,
    #[serde(default)]
    pub cores: u32,
    #[serde(default)]
    pub threads: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskFacts {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: String,
}

/// Physical/virtual classification derived from the virtualization role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HostType {
    Physical,
    Virtual,
    Unknown,
}

impl HostType {
    fn from_role(role: &str) -> Self {
        match role {
            "" | "NA" | "host" => HostType::Physical,
            "?" => HostType::Unknown,
            _ => HostType::Virtual,
        }
    }
}

/// A bonded logical interface and its member NICs.
#[derive(Debug, Clone, Serialize)]
pub struct LogicalInterface {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub members: Vec<LogicalInterfaceMember>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogicalInterfaceMember {
    pub name: String,
    pub mac_address: String,
}

/// Flat, report-ready representation of one merged host record. Every
/// field is explicitly present in the JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct QualifiedHost {
    pub name: String,
    pub os: String,
    pub department: String,
    #[serde(rename = "type")]
    pub host_type: HostType,
    pub comment: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub rack_name: String,
    pub rack_slot: String,
    pub cpu_model: String,
    pub cpu_base_freq: String,
    pub cpu_count: u32,
    pub cpu_cores: u32,
    pub cpu_threads: u32,
    pub populated_dimms: u32,
    pub maximum_dimms: u32,
    pub installed_memory: String,
    pub virtual_disks: Vec<DiskFacts>,
    pub physical_disks: Vec<DiskFacts>,
    pub primary_ip_address: String,
    pub ipmi_address: String,
    pub logical_intfs: Vec<LogicalInterface>,
}

impl QualifiedHost {
    /// Normalize one fact record into the reporting shape.
    #[must_use]
    pub fn from_facts(facts: &HostFacts) -> Self {
        // OpenBSD reports its usable version in the release field.
        let os = if facts.distribution == "OpenBSD" {
            format!("{} {}", facts.distribution, facts.distribution_release)
        } else {
            format!("{} {}", facts.distribution, facts.distribution_version)
        };

        let mut cpu_model = String::new();
        let mut cpu_base_freq = String::new();
        let mut cpu_count = 0;
        let mut cpu_cores = 0;
        let mut cpu_threads = 0;
        let mut all_sockets_match = true;
        for cpu in &facts.ipmi_cpus {
            if cpu_model.is_empty() {
                cpu_model = cpu.name.clone();
                cpu_base_freq = cpu.base_clock_speed.clone();
            }
            if cpu.name != cpu_model {
                all_sockets_match = false;
            }
            cpu_cores += cpu.cores;
            cpu_threads += cpu.threads;
            cpu_count += 1;
        }
        if !all_sockets_match {
            cpu_model.push_str(" and others");
        }

        let (rack_name, rack_slot) = facts
            .ipmi_system_location
            .as_ref()
            .map(|loc| (loc.rack_name.clone(), loc.rack_slot.clone()))
            .unwrap_or_default();

        let mut logical_intfs = Vec::new();
        for (name, intf) in &facts.interfaces {
            if intf.kind != "bonding" {
                continue;
            }
            let members = intf
                .slaves
                .iter()
                .map(|slave| LogicalInterfaceMember {
                    name: slave.clone(),
                    mac_address: facts
                        .interfaces
                        .get(slave)
                        .map(|member| member.mac_address.clone())
                        .unwrap_or_default(),
                })
                .collect();
            logical_intfs.push(LogicalInterface {
                name: name.clone(),
                kind: intf.kind.clone(),
                members,
            });
        }

        Self {
            name: facts.inventory_hostname.clone(),
            os,
            department: facts.department.clone(),
            host_type: HostType::from_role(&facts.virtualization_role),
            comment: facts.comment.clone(),
            manufacturer: facts.ipmi_manufacturer.clone(),
            model: facts.ipmi_model.clone(),
            serial_number: facts.ipmi_serial_number.clone(),
            rack_name,
            rack_slot,
            cpu_model,
            cpu_base_freq,
            cpu_count,
            cpu_cores,
            cpu_threads,
            populated_dimms: facts.ipmi_populated_dimms,
            maximum_dimms: facts.ipmi_max_dimms,
            installed_memory: facts.ipmi_memory_installed.clone(),
            virtual_disks: facts.ipmi_virtual_disks.clone(),
            physical_disks: facts.ipmi_physical_disks.clone(),
            primary_ip_address: facts
                .default_ipv4
                .as_ref()
                .map(|ip| ip.address.clone())
                .unwrap_or_default(),
            ipmi_address: facts.ipmi_address.clone(),
            logical_intfs,
        }
    }
}

/// Qualify every merged per-host document and sort the dataset by host
/// name. Host name is the join key, so the order is total.
pub fn qualify(merged: &BTreeMap<String, Vec<u8>>) -> Result<Vec<QualifiedHost>, ReportError> {
    let mut qualified = Vec::with_capacity(merged.len());
    for (host, bytes) in merged {
        let document: FactDocument =
            serde_json::from_slice(bytes).map_err(|source| ReportError::Parse {
                host: host.clone(),
                source,
            })?;
        let facts: HostFacts =
            serde_json::from_value(serde_json::Value::Object(document.facts)).map_err(
                |source| ReportError::Parse {
                    host: host.clone(),
                    source,
                },
            )?;
        qualified.push(QualifiedHost::from_facts(&facts));
    }
    qualified.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(value: serde_json::Value) -> HostFacts {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn openbsd_uses_release_in_os_string() {
        let qualified = QualifiedHost::from_facts(&facts(serde_json::json!({
            "distribution": "OpenBSD",
            "distribution_release": "7.4",
            "distribution_version": "GENERIC.MP#1397",
        })));
        assert_eq!(qualified.os, "OpenBSD 7.4");
    }

    #[test]
    fn other_distributions_use_version_in_os_string() {
        let qualified = QualifiedHost::from_facts(&facts(serde_json::json!({
            "distribution": "Debian",
            "distribution_release": "bookworm",
            "distribution_version": "12.5",
        })));
        assert_eq!(qualified.os, "Debian 12.5");
    }

    #[test]
    fn virtualization_role_classifies_host_type() {
        for (role, expected) in [
            ("", HostType::Physical),
            ("NA", HostType::Physical),
            ("host", HostType::Physical),
            ("?", HostType::Unknown),
            ("guest", HostType::Virtual),
        ] {
            let qualified = QualifiedHost::from_facts(&facts(serde_json::json!({
                "virtualization_role": role,
            })));
            assert_eq!(qualified.host_type, expected, "role {role:?}");
        }
    }

    #[test]
    fn cpu_sockets_aggregate_across_the_board() {
        let qualified = QualifiedHost::from_facts(&facts(serde_json::json!({
            "ipmi_cpus": [
                {"name": "Xeon 4310", "base_clock_speed": "2.1GHz", "cores": 12, "threads": 24},
                {"name": "Xeon 4310", "base_clock_speed": "2.1GHz", "cores": 12, "threads": 24},
            ],
        })));
        assert_eq!(qualified.cpu_model, "Xeon 4310");
        assert_eq!(qualified.cpu_base_freq, "2.1GHz");
        assert_eq!(qualified.cpu_count, 2);
        assert_eq!(qualified.cpu_cores, 24);
        assert_eq!(qualified.cpu_threads, 48);
    }

    #[test]
    fn disagreeing_sockets_flag_the_model_name() {
        let qualified = QualifiedHost::from_facts(&facts(serde_json::json!({
            "ipmi_cpus": [
                {"name": "Xeon 4310", "cores": 12, "threads": 24},
                {"name": "Xeon 6330", "cores": 28, "threads": 56},
            ],
        })));
        assert_eq!(qualified.cpu_model, "Xeon 4310 and others");
    }

    #[test]
    fn bonded_interfaces_are_flattened_with_member_macs() {
        let qualified = QualifiedHost::from_facts(&facts(serde_json::json!({
            "interfaces": {
                "bond0": {"type": "bonding", "slaves": ["eth0", "eth1"]},
                "eth0": {"type": "ether", "mac_address": "aa:bb:cc:00:00:01"},
                "eth1": {"type": "ether", "mac_address": "aa:bb:cc:00:00:02"},
            },
        })));
        assert_eq!(qualified.logical_intfs.len(), 1);
        let bond = &qualified.logical_intfs[0];
        assert_eq!(bond.name, "bond0");
        assert_eq!(bond.members.len(), 2);
        assert_eq!(bond.members[0].mac_address, "aa:bb:cc:00:00:01");
    }

    #[test]
    fn qualify_sorts_by_host_name() {
        let mut merged = BTreeMap::new();
        for name in ["charlie", "alpha", "bravo"] {
            let doc = serde_json::json!({
                "ansible_facts": {"inventory_hostname": name},
                "changed": false,
            });
            merged.insert(name.to_string(), serde_json::to_vec(&doc).unwrap());
        }
        let qualified = qualify(&merged).unwrap();
        let names: Vec<_> = qualified.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn qualify_rejects_undecodable_documents() {
        let mut merged = BTreeMap::new();
        merged.insert("node-1".to_string(), b"not json".to_vec());
        assert!(matches!(
            qualify(&merged),
            Err(ReportError::Parse { host, .. }) if host == "node-1"
        ));
    }
}
