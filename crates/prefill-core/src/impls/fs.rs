//! JSON file helpers shared by the file-backed stores.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::PrefillError;

/// Reads and parses a JSON file. `Ok(None)` when the file does not exist.
pub(crate) async fn read_json<T: DeserializeOwned>(
    path: &Path,
    what: &'static str,
) -> Result<Option<T>, PrefillError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PrefillError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| PrefillError::Parse {
            what,
            path: path.to_path_buf(),
            source,
        })
}

/// Writes the value to a sibling temp file and renames it over `path`, so
/// readers see either the old file or the complete new one.
pub(crate) async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PrefillError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PrefillError::io(parent, e))?;
    }

    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| PrefillError::io(path, std::io::Error::from(e)))?;
    let tmp_path = path.with_extension("tmp");

    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| PrefillError::io(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PrefillError::io(path, e))?;
    Ok(())
}
