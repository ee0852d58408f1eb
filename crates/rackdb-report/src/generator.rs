//! End-to-end report pipeline

use std::path::Path;

use rackdb_inventory::Inventory;
use rackdb_model::Host;
use rackdb_tasks::{TaskError, TaskSet};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{info, instrument};

use crate::collector::CollectorTask;
use crate::error::ReportError;
use crate::export::write_inventory_file;
use crate::merge::merge_results;
use crate::qualify::qualify;

/// Which hosts a report build covers.
#[derive(Debug, Clone)]
pub enum HostSelection {
    All,
    Named(Vec<String>),
}

/// Output form of a report build. Exactly one must be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Write the rendered inventory file itself
    Export,
    /// Write the merged per-host fact documents into a directory
    Ansible,
    /// Write the qualified, sorted dataset as JSON
    Json,
    /// Render a static HTML report through the external `ansible-cmdb` tool
    Html,
}

impl ReportMode {
    /// Resolve the mutually exclusive CLI flags into one mode.
    pub fn from_flags(
        export: bool,
        ansible: bool,
        json: bool,
        html: bool,
    ) -> Result<Self, ReportError> {
        let selected = [
            (export, ReportMode::Export),
            (ansible, ReportMode::Ansible),
            (json, ReportMode::Json),
            (html, ReportMode::Html),
        ];
        let mut mode = None;
        for (flag, candidate) in selected {
            if !flag {
                continue;
            }
            if mode.is_some() {
                return Err(ReportError::MultipleMode);
            }
            mode = Some(candidate);
        }
        mode.ok_or(ReportError::UnknownMode)
    }

    fn stages(self) -> usize {
        match self {
            ReportMode::Export => 1,
            ReportMode::Ansible | ReportMode::Json => 3,
            ReportMode::Html => 4,
        }
    }
}

/// Collector modules every full report build fans out to. The `canonical`
/// module is tolerated to fail per host; `ipmi` is required.
const COLLECTOR_MODULES: [(&str, bool); 2] = [("canonical", false), ("ipmi", true)];

const HTML_RENDERER: &str = "ansible-cmdb";

/// Drives the collection/merge pipeline and hands the dataset to the
/// selected renderer.
pub struct ReportGenerator<'a> {
    inventory: &'a Inventory,
}

impl<'a> ReportGenerator<'a> {
    #[must_use]
    pub fn new(inventory: &'a Inventory) -> Self {
        Self { inventory }
    }

    /// Build a report for the selected hosts and save it at `output`.
    ///
    /// Any stage failure aborts the whole build. Temporary artifacts are
    /// released on every exit path.
    #[instrument(skip(self))]
    pub async fn generate(
        &self,
        selection: HostSelection,
        mode: ReportMode,
        output: &Path,
    ) -> Result<(), ReportError> {
        let stages = mode.stages();
        info!(stage = 1, stages, "exporting inventory");
        let hosts = self.select_hosts(selection).await?;
        let inventory_file = write_inventory_file(&hosts)?;

        if mode == ReportMode::Export {
            std::fs::copy(inventory_file.path(), output)?;
            return Ok(());
        }

        info!(stage = 2, stages, "collecting host information");
        let collectors: Vec<CollectorTask> = COLLECTOR_MODULES
            .iter()
            .map(|(module, required)| {
                CollectorTask::new(module, inventory_file.path(), *required)
            })
            .collect();
        let merged = TaskSet::new(collectors)
            .run(|outputs| {
                merge_results(&outputs).map_err(|err| TaskError::Export(err.to_string()))
            })
            .await?;

        info!(stage = 3, stages, "exporting chunk data");
        match mode {
            ReportMode::Json => {
                let qualified = qualify(&merged)?;
                let data = serde_json::to_vec(&qualified).map_err(ReportError::Serialize)?;
                std::fs::write(output, data)?;
            }
            ReportMode::Ansible => {
                write_fact_tree(&merged, output)?;
            }
            ReportMode::Html => {
                let staging = TempDir::new()?;
                write_fact_tree(&merged, staging.path())?;
                info!(stage = 4, stages, "rendering html report");
                let rendered = Command::new(HTML_RENDERER)
                    .arg("-i")
                    .arg(inventory_file.path())
                    .arg(staging.path())
                    .output()
                    .await
                    .map_err(|err| ReportError::ExternalTool {
                        tool: HTML_RENDERER.to_string(),
                        reason: err.to_string(),
                    })?;
                if !rendered.status.success() {
                    return Err(ReportError::ExternalTool {
                        tool: HTML_RENDERER.to_string(),
                        reason: format!(
                            "{}\n\n{}",
                            rendered.status,
                            String::from_utf8_lossy(&rendered.stderr)
                        ),
                    });
                }
                std::fs::write(output, &rendered.stdout)?;
            }
            ReportMode::Export => unreachable!("handled before collection"),
        }
        info!("report saved");
        Ok(())
    }

    async fn select_hosts(&self, selection: HostSelection) -> Result<Vec<Host>, ReportError> {
        match selection {
            HostSelection::All => Ok(self.inventory.list().await?),
            HostSelection::Named(names) => {
                let mut hosts = Vec::with_capacity(names.len());
                for name in names {
                    hosts.push(self.inventory.get(&name).await?);
                }
                Ok(hosts)
            }
        }
    }
}

fn write_fact_tree(
    merged: &std::collections::BTreeMap<String, Vec<u8>>,
    dir: &Path,
) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir)?;
    for (host, bytes) in merged {
        std::fs::write(dir.join(host), bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_mode_must_be_selected() {
        assert!(matches!(
            ReportMode::from_flags(false, false, false, false),
            Err(ReportError::UnknownMode)
        ));
        assert!(matches!(
            ReportMode::from_flags(true, false, true, false),
            Err(ReportError::MultipleMode)
        ));
        assert_eq!(
            ReportMode::from_flags(false, false, true, false).unwrap(),
            ReportMode::Json
        );
    }

    #[test]
    fn stage_counts_match_the_pipeline() {
        assert_eq!(ReportMode::Export.stages(), 1);
        assert_eq!(ReportMode::Json.stages(), 3);
        assert_eq!(ReportMode::Ansible.stages(), 3);
        assert_eq!(ReportMode::Html.stages(), 4);
    }

    #[test]
    fn fact_tree_writes_one_file_per_host() {
        let dir = TempDir::new().unwrap();
        let mut merged = std::collections::BTreeMap::new();
        merged.insert("node-1".to_string(), b"{}".to_vec());
        merged.insert("node-2".to_string(), b"{}".to_vec());
        write_fact_tree(&merged, &dir.path().join("facts")).unwrap();
        assert!(dir.path().join("facts/node-1").is_file());
        assert!(dir.path().join("facts/node-2").is_file());
    }
}
