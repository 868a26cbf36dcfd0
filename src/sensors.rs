//! Sensor log reader.
//!
//! The sensor log is a UTF-8 JSON array of [`SensorSnapshot`]s, oldest
//! first. Only the tail of the log is ever needed.

use std::path::Path;

use crate::error::SensorLogError;
use crate::models::SensorSnapshot;

/// Read the last `num_entries` snapshots, in log order.
pub fn read_latest(path: &Path, num_entries: usize) -> Result<Vec<SensorSnapshot>, SensorLogError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SensorLogError::NotFound(path.to_path_buf())
        } else {
            SensorLogError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let mut entries: Vec<SensorSnapshot> =
        serde_json::from_slice(&bytes).map_err(|e| SensorLogError::InvalidJson {
            path: path.to_path_buf(),
            source: e,
        })?;

    let start = entries.len().saturating_sub(num_entries);
    Ok(entries.split_off(start))
}

/// Non-fatal form of [`read_latest`]: a missing or malformed log is logged
/// and treated as "no data".
pub fn get_latest_sensor_data(path: &Path, num_entries: usize) -> Vec<SensorSnapshot> {
    match read_latest(path, num_entries) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("{}", e);
            Vec::new()
        }
    }
}
