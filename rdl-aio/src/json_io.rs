// rdl-aio/src/json_io.rs
use std::path::Path;

use rdl_common::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Writes serializable data to a JSON file (pretty-printed), replacing any
/// previous content atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    debug!("Writing JSON to: {}", path.display());
    let json_bytes = serde_json::to_vec_pretty(data)?;
    crate::fs::atomic_write_file(path, &json_bytes)
}

/// Reads and deserializes data from a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Reading JSON from: {}", path.display());
    let json_bytes = crate::fs::read_to_bytes(path)?;
    Ok(serde_json::from_slice(&json_bytes)?)
}
