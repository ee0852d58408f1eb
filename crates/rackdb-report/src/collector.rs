//! External collector task
//!
//! Runs one collector module via `ansible all -m <module>` against an
//! inventory file. The module writes one output file per host into a
//! private temporary directory, which is read back into memory and then
//! removed. Collector execution itself carries no timeout: a hanging
//! collector blocks the whole fan-in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rackdb_tasks::{Task, TaskError};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

/// Per-host raw collector output, keyed by host name.
pub type CollectorOutput = HashMap<String, Vec<u8>>;

const COLLECTOR_BIN: &str = "ansible";

/// How many trailing output lines are kept when a collector fails.
const FAILURE_TAIL_LINES: usize = 16;

/// One collector invocation against the exported inventory.
pub struct CollectorTask {
    module: String,
    inventory_file: PathBuf,
    /// Optional collectors tolerate a non-zero exit and report whatever
    /// per-host files were produced.
    required: bool,
}

impl CollectorTask {
    #[must_use]
    pub fn new(module: &str, inventory_file: &Path, required: bool) -> Self {
        Self {
            module: module.to_string(),
            inventory_file: inventory_file.to_path_buf(),
            required,
        }
    }
}

#[async_trait]
impl Task for CollectorTask {
    type Output = CollectorOutput;

    async fn execute(self) -> Result<CollectorOutput, TaskError> {
        let dir = TempDir::new().map_err(|err| TaskError::Failed(err.to_string()))?;
        debug!(module = %self.module, dir = %dir.path().display(), "running collector");

        let output = Command::new(COLLECTOR_BIN)
            .arg("all")
            .arg("-m")
            .arg(&self.module)
            .arg("-i")
            .arg(&self.inventory_file)
            .arg("-t")
            .arg(dir.path())
            .output()
            .await
            .map_err(|err| {
                TaskError::Failed(format!(
                    "could not invoke '{COLLECTOR_BIN}' for module '{}': {err}",
                    self.module
                ))
            })?;

        if !output.status.success() {
            if self.required {
                let reason = tail_lines(&String::from_utf8_lossy(&output.stdout), FAILURE_TAIL_LINES);
                return Err(TaskError::Failed(format!(
                    "error occurred while calling collector module '{}': {}\n\n{}",
                    self.module, output.status, reason
                )));
            }
            warn!(module = %self.module, status = %output.status, "optional collector exited non-zero");
        }

        let result = read_output_dir(dir.path()).await?;
        debug!(module = %self.module, hosts = result.len(), "collector finished");
        Ok(result)
    }
}

async fn read_output_dir(dir: &Path) -> Result<CollectorOutput, TaskError> {
    let mut result = CollectorOutput::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|err| TaskError::Failed(err.to_string()))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| TaskError::Failed(err.to_string()))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|err| TaskError::Failed(err.to_string()))?;
        if !file_type.is_file() {
            continue;
        }
        let data = tokio::fs::read(entry.path())
            .await
            .map_err(|err| TaskError::Failed(err.to_string()))?;
        result.insert(entry.file_name().to_string_lossy().into_owned(), data);
    }
    Ok(result)
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
