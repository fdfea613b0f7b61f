//! DepotQueueBuilder port - デポ選択とチャンクキュー構築

use async_trait::async_trait;

use crate::config::DepotCriteria;
use crate::domain::{AppInfo, DepotInfo, Endpoint, PrefillError, QueuedRequest};

/// Resolves which depots of an app to fetch and which chunks they need.
///
/// The three calls are made in order for one app: `filter_depots`,
/// `link_depots`, `build_queue`.
#[async_trait]
pub trait DepotQueueBuilder: Send + Sync {
    /// Keep the depots matching the operator's criteria.
    async fn filter_depots(
        &self,
        app: &AppInfo,
        depots: Vec<DepotInfo>,
        criteria: &DepotCriteria,
    ) -> Result<Vec<DepotInfo>, PrefillError>;

    /// Resolve depots whose content is served from another app.
    async fn link_depots(
        &self,
        app: &AppInfo,
        depots: Vec<DepotInfo>,
    ) -> Result<Vec<DepotInfo>, PrefillError>;

    /// Chunks still missing from the cache. Empty means nothing to fetch.
    async fn build_queue(
        &self,
        app: &AppInfo,
        depots: &[DepotInfo],
        endpoints: &[Endpoint],
    ) -> Result<Vec<QueuedRequest>, PrefillError>;
}
