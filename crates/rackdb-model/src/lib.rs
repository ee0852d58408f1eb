//! rackdb-model: the Host entity and its display forms
//!
//! The Host record is the only persisted entity in rackdb. This crate owns
//! its wire format (a self-describing JSON document) and the fixed-column
//! tabular rendering used by the CLI.

pub mod host;

pub use host::{ExtraInfo, Host, normalize_key, render_host_table};
