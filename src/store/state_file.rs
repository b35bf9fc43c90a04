//! State file handling for the `ipam` binary.
//!
//! A state file holds a single object status as JSON, tagged by `kind`.
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a failed write never leaves a half-written state behind.

use crate::models::{CounterDoc, NetworkStatus, SubnetStatus};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

/// Contents of a state file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StateDoc {
    Subnet(SubnetStatus),
    Network(NetworkStatus),
    Counter(CounterDoc),
}

impl StateDoc {
    pub fn kind(&self) -> &'static str {
        match self {
            StateDoc::Subnet(_) => "subnet",
            StateDoc::Network(_) => "network",
            StateDoc::Counter(_) => "counter",
        }
    }
}

/// Read a state file.
///
/// # Arguments
/// * `path` - The JSON file to read
///
/// # Returns
/// * `Ok(StateDoc)` - The parsed state
/// * `Err` - If the file is missing or the JSON does not match, with the JSON path of the problem
pub fn read_state(path: &Path) -> Result<StateDoc, Box<dyn Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading state file {}: {e}", path.display()))?;
    log::info!("Reading state file: {}", path.display());

    let mut deserializer = serde_json::Deserializer::from_str(&json);
    let doc: StateDoc = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        format!(
            "Error parsing state file {}: path={} error={}",
            path.display(),
            e.path(),
            e
        )
    })?;
    log::debug!("state file {} holds a {}", path.display(), doc.kind());
    Ok(doc)
}

/// Write a state file, replacing any previous content.
pub fn write_state(path: &Path, doc: &StateDoc) -> Result<(), Box<dyn Error>> {
    let json =
        serde_json::to_string_pretty(doc).map_err(|e| format!("Error serializing state: {e}"))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .map_err(|e| format!("Error writing state file {}: {e}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| format!("Error replacing state file {}: {e}", path.display()))?;
    log::info!("Wrote {} state to {}", doc.kind(), path.display());
    Ok(())
}
