//! SessionClient port - ログイン済みセッション

use async_trait::async_trait;

use crate::domain::{AppId, License, PrefillError};

/// The logged-in session of the account being prefilled.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Stable key the entitlement snapshot is persisted under.
    fn account_key(&self) -> String;

    /// Raw license list, expired ones included.
    async fn licenses(&self) -> Result<Vec<License>, PrefillError>;

    /// Apps the account owns according to the session itself.
    async fn owned_app_ids(&self) -> Result<Vec<AppId>, PrefillError>;

    async fn recently_played_app_ids(&self) -> Result<Vec<AppId>, PrefillError>;
}
