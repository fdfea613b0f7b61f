//! DownloadExecutor port - チャンク転送

use async_trait::async_trait;

use crate::domain::{AppInfo, PrefillError, QueuedRequest, TransferReport};

/// Pulls a queue through the cache. Its internal chunk concurrency is its own
/// business; the call resolves once the whole queue is done.
///
/// Implementations report `CacheUnreachable` when the cache stops answering
/// entirely and `InfiniteRetry` when the same chunks keep failing.
#[async_trait]
pub trait DownloadExecutor: Send + Sync {
    async fn download(
        &self,
        app: &AppInfo,
        requests: &[QueuedRequest],
    ) -> Result<TransferReport, PrefillError>;
}
