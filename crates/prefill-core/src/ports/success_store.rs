//! SuccessStateStore port - 「最新」判定用の永続状態

use async_trait::async_trait;

use crate::domain::{DepotId, PrefillError};

/// Depot id -> manifest id of the last fully successful download.
///
/// Written only after an app's download is confirmed.
#[async_trait]
pub trait SuccessStateStore: Send + Sync {
    async fn get(&self, depot_id: DepotId) -> Result<Option<u64>, PrefillError>;

    async fn put_all(&self, entries: &[(DepotId, u64)]) -> Result<(), PrefillError>;
}
