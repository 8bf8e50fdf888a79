// # Snapshot Writer
//
// Serializes fetched data to pretty-printed JSON files in the target
// directory, one file per logical name. Existing files are overwritten in
// place; there is no write-then-rename step.
//
// ## Layout
//
// ```text
// <dir>/zones.json              full zone list
// <dir>/<zone-name>.zone.json   records of one zone
// ```

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::Error;

/// Logical name of the zone list file
pub const ZONES_FILE: &str = "zones";

/// Logical name of the record file for `zone_name`
///
/// Fails when the zone name could escape the target directory or name a
/// hidden/special entry.
pub fn zone_file_name(zone_name: &str) -> Result<String, Error> {
    let invalid = zone_name.is_empty()
        || zone_name == "."
        || zone_name == ".."
        || zone_name.starts_with('.')
        || zone_name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(Error::invalid_input(format!(
            "Zone name cannot be used as a file name: {:?}",
            zone_name
        )));
    }

    Ok(format!("{}.zone", zone_name))
}

/// Write `value` as pretty JSON to `<dir>/<logical_name>.json`
///
/// Returns the written path so the caller can track it for pruning.
pub async fn write_json<T>(dir: &Path, logical_name: &str, value: &T) -> Result<PathBuf, Error>
where
    T: Serialize + ?Sized,
{
    let path = dir.join(format!("{}.json", logical_name));

    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');

    fs::write(&path, json.as_bytes()).await.map_err(|e| {
        Error::snapshot(format!("Failed to write {}: {}", path.display(), e))
    })?;

    tracing::debug!("Wrote {}", path.display());
    Ok(path)
}

/// Create the target directory (and parents) if it does not exist
pub async fn ensure_dir(dir: &Path) -> Result<(), Error> {
    fs::create_dir_all(dir).await.map_err(|e| {
        Error::snapshot(format!(
            "Failed to create snapshot directory {}: {}",
            dir.display(),
            e
        ))
    })
}
