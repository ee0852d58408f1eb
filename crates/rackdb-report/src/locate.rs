//! IPMI location query and update through the external `racadm` tool

use std::collections::BTreeMap;
use std::str::FromStr;

use rackdb_inventory::Inventory;
use rackdb_model::Host;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::ReportError;

const RACADM_BIN: &str = "racadm";

/// Addressable fields of a host's physical location record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    Aisle,
    Datacenter,
    RackName,
    RackSlot,
    RoomName,
}

impl FromStr for LocationField {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aisle" => Ok(LocationField::Aisle),
            "datacenter" => Ok(LocationField::Datacenter),
            "rackname" => Ok(LocationField::RackName),
            "rackslot" => Ok(LocationField::RackSlot),
            "roomname" => Ok(LocationField::RoomName),
            other => Err(ReportError::UnknownLocationField(other.to_string())),
        }
    }
}

impl LocationField {
    /// Configuration namespace the field lives under.
    fn namespace(self) -> &'static str {
        match self {
            LocationField::Aisle => "System.Location.Aisle",
            LocationField::Datacenter => "System.Location.DataCenter",
            LocationField::RackName => "System.Location.Rack.Name",
            LocationField::RackSlot => "System.Location.Rack.Slot",
            LocationField::RoomName => "System.Location.RoomName",
        }
    }

    /// Key the field appears under in `System.Location` query output.
    fn result_key(self) -> &'static str {
        match self {
            LocationField::Aisle => "Aisle",
            LocationField::Datacenter => "DataCenter",
            LocationField::RackName => "Rack.Name",
            LocationField::RackSlot => "Rack.Slot",
            LocationField::RoomName => "RoomName",
        }
    }
}

/// Queries and updates host locations through out-of-band management.
pub struct LocationManager<'a> {
    inventory: &'a Inventory,
}

impl<'a> LocationManager<'a> {
    #[must_use]
    pub fn new(inventory: &'a Inventory) -> Self {
        Self { inventory }
    }

    /// Read the full `System.Location` record of a host.
    #[instrument(skip(self))]
    pub async fn get(&self, host_id: &str) -> Result<BTreeMap<String, String>, ReportError> {
        let host = self.inventory.get(host_id).await?;
        run_racadm(&host, "get", "System.Location", None).await
    }

    /// Write one location field, then re-read the record and verify the
    /// change actually took effect.
    #[instrument(skip(self))]
    pub async fn set(
        &self,
        host_id: &str,
        field: LocationField,
        value: &str,
    ) -> Result<BTreeMap<String, String>, ReportError> {
        let host = self.inventory.get(host_id).await?;
        run_racadm(&host, "set", field.namespace(), Some(value)).await?;

        let location = run_racadm(&host, "get", "System.Location", None).await?;
        let applied = location.get(field.result_key()).map(String::as_str);
        if applied != Some(value) {
            return Err(ReportError::ChangeNotCommitted);
        }
        Ok(location)
    }
}

async fn run_racadm(
    host: &Host,
    subcommand: &str,
    namespace: &str,
    param: Option<&str>,
) -> Result<BTreeMap<String, String>, ReportError> {
    if host.ipmi_address.is_empty() {
        return Err(ReportError::MissingIpmiAddress);
    }
    let mut command = Command::new(RACADM_BIN);
    command
        .arg("-r")
        .arg(&host.ipmi_address)
        .arg("-u")
        .arg(&host.ipmi_user)
        .arg("-p")
        .arg(&host.ipmi_password)
        .arg("--nocertwarn")
        .arg(subcommand)
        .arg(namespace);
    if let Some(param) = param {
        command.arg(param);
    }
    let output = command.output().await.map_err(|err| ReportError::ExternalTool {
        tool: RACADM_BIN.to_string(),
        reason: err.to_string(),
    })?;
    if !output.status.success() {
        return Err(ReportError::ExternalTool {
            tool: RACADM_BIN.to_string(),
            reason: format!(
                "{}\n\n{}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }
    let parsed = parse_racadm_output(&String::from_utf8_lossy(&output.stdout));
    debug!(host = %host.hostname, subcommand, namespace, keys = parsed.len(), "racadm finished");
    Ok(parsed)
}

/// Parse `key=value` lines out of racadm output, dropping the leading `#`
/// marker racadm puts on some keys.
fn parse_racadm_output(output: &str) -> BTreeMap<String, String> {
    let mut parsed = BTreeMap::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.trim().split('=').collect();
        if parts.len() != 2 {
            continue;
        }
        let key = parts[0].trim_start_matches('#').to_string();
        parsed.insert(key, parts[1].to_string());
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines_and_strips_hash_prefix() {
        let output = "#DeviceSize=2U\r\nAisle=A3\r\nRack.Name=R12\r\nno pairs here\r\n";
        let parsed = parse_racadm_output(output);
        assert_eq!(parsed.get("DeviceSize").map(String::as_str), Some("2U"));
        assert_eq!(parsed.get("Aisle").map(String::as_str), Some("A3"));
        assert_eq!(parsed.get("Rack.Name").map(String::as_str), Some("R12"));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn lines_with_multiple_separators_are_skipped() {
        let parsed = parse_racadm_output("a=b=c\nplain=ok");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("plain").map(String::as_str), Some("ok"));
    }

    #[test]
    fn field_names_parse_from_cli_spelling() {
        assert_eq!(
            "rackslot".parse::<LocationField>().unwrap(),
            LocationField::RackSlot
        );
        assert!(matches!(
            "shelf".parse::<LocationField>(),
            Err(ReportError::UnknownLocationField(_))
        ));
    }

    #[test]
    fn namespaces_cover_every_field() {
        assert_eq!(
            LocationField::Datacenter.namespace(),
            "System.Location.DataCenter"
        );
        assert_eq!(LocationField::RackSlot.result_key(), "Rack.Slot");
    }
}
