//! SuccessStateStore implementations.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::fs::{read_json, write_json_atomic};
use crate::domain::{DepotId, PrefillError};
use crate::ports::SuccessStateStore;

/// Process-local store; state is lost on drop.
#[derive(Debug, Default)]
pub struct InMemorySuccessStore {
    entries: Mutex<HashMap<DepotId, u64>>,
}

impl InMemorySuccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl SuccessStateStore for InMemorySuccessStore {
    async fn get(&self, depot_id: DepotId) -> Result<Option<u64>, PrefillError> {
        Ok(self.entries.lock().get(&depot_id).copied())
    }

    async fn put_all(&self, entries: &[(DepotId, u64)]) -> Result<(), PrefillError> {
        self.entries.lock().extend(entries.iter().copied());
        Ok(())
    }
}

/// Store persisted as one JSON object (`{"<depot id>": <manifest id>}`).
///
/// The whole map is loaded on open and rewritten atomically on every
/// `put_all`.
pub struct JsonFileSuccessStore {
    path: PathBuf,
    entries: tokio::sync::Mutex<BTreeMap<DepotId, u64>>,
}

impl JsonFileSuccessStore {
    /// A missing file is an empty store; a corrupt one is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PrefillError> {
        let path = path.into();
        let entries = read_json(&path, "success state").await?.unwrap_or_default();
        Ok(Self {
            path,
            entries: tokio::sync::Mutex::new(entries),
        })
    }
}

#[async_trait]
impl SuccessStateStore for JsonFileSuccessStore {
    async fn get(&self, depot_id: DepotId) -> Result<Option<u64>, PrefillError> {
        Ok(self.entries.lock().await.get(&depot_id).copied())
    }

    async fn put_all(&self, entries: &[(DepotId, u64)]) -> Result<(), PrefillError> {
        // held across the write so two callers cannot interleave files
        let mut guard = self.entries.lock().await;
        let mut next = guard.clone();
        next.extend(entries.iter().copied());
        write_json_atomic(&self.path, &next).await?;
        *guard = next;
        Ok(())
    }
}
