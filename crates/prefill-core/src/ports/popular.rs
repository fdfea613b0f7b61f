//! PopularAppsSource port - 人気ランキング

use async_trait::async_trait;

use crate::domain::{AppId, PrefillError};

#[async_trait]
pub trait PopularAppsSource: Send + Sync {
    /// The `n` most popular apps, most popular first.
    async fn top(&self, n: usize) -> Result<Vec<AppId>, PrefillError>;
}
