//! AppMetadataService port - アプリのメタデータ

use async_trait::async_trait;

use crate::domain::{AppId, AppInfo, PrefillError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// Fold DLC depots into their parent app's depot list.
    pub include_dlc: bool,
}

#[async_trait]
pub trait AppMetadataService: Send + Sync {
    /// Batch lookup. Ids the service does not know are simply absent from
    /// the result.
    async fn lookup(
        &self,
        ids: &[AppId],
        options: LookupOptions,
    ) -> Result<Vec<AppInfo>, PrefillError>;
}
