//! SelectionStore - オペレーターが選択したアプリ一覧

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{AppId, PrefillError};
use crate::impls::fs::{read_json, write_json_atomic};

/// The operator's saved app selection, a JSON array of app ids.
///
/// Unlike the entitlement snapshot, a selection file that exists but cannot
/// be read is an error: treating it as empty would silently drop the
/// operator's choice.
#[derive(Debug, Clone)]
pub struct SelectionStore {
    path: PathBuf,
}

impl SelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<AppId>, PrefillError> {
        let ids: Vec<AppId> = read_json(&self.path, "app selection")
            .await?
            .unwrap_or_default();
        debug!(count = ids.len(), "loaded app selection");
        Ok(ids)
    }

    /// Overwrites the saved selection (sorted, duplicates dropped).
    pub async fn save(&self, ids: &[AppId]) -> Result<(), PrefillError> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        write_json_atomic(&self.path, &ids).await
    }
}
