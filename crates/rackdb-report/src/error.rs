//! Error types for rackdb-report

use rackdb_inventory::InventoryError;
use rackdb_tasks::TaskError;
use thiserror::Error;

/// Errors surfaced by the report pipeline and location manager
#[derive(Error, Debug)]
pub enum ReportError {
    /// No report mode was selected
    #[error("unknown report mode")]
    UnknownMode,

    /// More than one mutually exclusive report mode was selected
    #[error("multiple report modes selected and only a single mode is acceptable")]
    MultipleMode,

    /// Collector result sets describe different host sets
    #[error("collector results' inventories did not match")]
    JoinMismatch,

    /// An invoked external tool exited non-zero or could not be spawned
    #[error("external tool '{tool}' failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    /// A collector output document could not be decoded
    #[error("malformed collector output for host '{host}': {source}")]
    Parse {
        host: String,
        source: serde_json::Error,
    },

    /// IPMI-dependent operation attempted on a host without an IPMI address
    #[error("host's IPMI address was not allocated")]
    MissingIpmiAddress,

    /// Location field name outside the supported set
    #[error(
        "no such field: only 'aisle', 'datacenter', 'rackname', 'rackslot', and 'roomname' are acceptable"
    )]
    UnknownLocationField(String),

    /// Location write reported success but re-reading showed no change
    #[error("modification succeeded but the change was not applied")]
    ChangeNotCommitted,

    /// Inventory lookup failure, passed through
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Task engine failure, passed through
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Filesystem failure while staging or writing report artifacts
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Qualified dataset could not be serialized
    #[error("could not serialize report: {0}")]
    Serialize(#[source] serde_json::Error),
}
