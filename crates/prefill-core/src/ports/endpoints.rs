//! Endpoint ports - CDN エンドポイント

use async_trait::async_trait;

use crate::domain::{Endpoint, PrefillError};

/// Finds CDN endpoints. Called by the pool, not by the pipeline.
#[async_trait]
pub trait EndpointDiscovery: Send + Sync {
    async fn discover(&self) -> Result<Vec<Endpoint>, PrefillError>;
}

/// Endpoint pool shared by every app of a run.
///
/// `ensure_populated` is called once per app; only the first call (or the
/// first after a failure) does any work.
#[async_trait]
pub trait EndpointPool: Send + Sync {
    async fn ensure_populated(&self) -> Result<(), PrefillError>;

    fn snapshot(&self) -> Vec<Endpoint>;
}
