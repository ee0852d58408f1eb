//! rackdb-report: concurrent collection and merge pipeline
//!
//! Builds consolidated host reports in up to four stages: export the
//! stored hosts as a collector-consumable inventory file, fan out the
//! external collector tasks, join their per-host outputs by hostname, and
//! qualify the merged dataset into a sorted, report-ready shape. Any
//! stage failure aborts the whole build; temporary files are released on
//! every exit path.

pub mod collector;
pub mod error;
pub mod export;
pub mod generator;
pub mod locate;
pub mod merge;
pub mod qualify;

pub use collector::CollectorTask;
pub use error::ReportError;
pub use generator::{HostSelection, ReportGenerator, ReportMode};
pub use locate::{LocationField, LocationManager};
pub use merge::{FactDocument, merge_results};
pub use qualify::{HostType, QualifiedHost, qualify};
