//! Join of per-host collector result sets
//!
//! Collector outputs are joined by host name. The join is deliberately
//! strict: every result set must describe exactly the same host set,
//! otherwise the merge fails rather than silently producing a report
//! covering the wrong hosts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collector::CollectorOutput;
use crate::error::ReportError;

/// Structured document every collector writes per host: a free-form fact
/// mapping plus a changed flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactDocument {
    #[serde(default, rename = "ansible_facts")]
    pub facts: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub changed: bool,
}

/// Join two or more collector result sets by host name.
///
/// Fails with [`ReportError::JoinMismatch`] unless all sets have identical
/// cardinality and identical key sets. For each host the fact maps are
/// unioned (a later collector's keys win on collision) and the changed
/// flags are combined with logical AND.
pub fn merge_results(results: &[CollectorOutput]) -> Result<BTreeMap<String, Vec<u8>>, ReportError> {
    let mut merged = BTreeMap::new();
    let Some(reference) = results.first() else {
        return Ok(merged);
    };
    for other in &results[1..] {
        if other.len() != reference.len() {
            return Err(ReportError::JoinMismatch);
        }
        if reference.keys().any(|k| !other.contains_key(k)) {
            return Err(ReportError::JoinMismatch);
        }
        if other.keys().any(|k| !reference.contains_key(k)) {
            return Err(ReportError::JoinMismatch);
        }
    }

    for host in reference.keys() {
        let mut combined = FactDocument {
            facts: serde_json::Map::new(),
            changed: true,
        };
        for result in results {
            let document = decode(host, &result[host])?;
            for (key, value) in document.facts {
                combined.facts.insert(key, value);
            }
            combined.changed = combined.changed && document.changed;
        }
        let bytes = serde_json::to_vec(&combined).map_err(ReportError::Serialize)?;
        merged.insert(host.clone(), bytes);
    }
    debug!(hosts = merged.len(), sets = results.len(), "merged collector results");
    Ok(merged)
}

fn decode(host: &str, bytes: &[u8]) -> Result<FactDocument, ReportError> {
    serde_json::from_slice(bytes).map_err(|source| ReportError::Parse {
        host: host.to_string(),
        source,
    })
}
