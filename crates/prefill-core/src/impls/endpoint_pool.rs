//! CachedEndpointPool - 実行中に共有されるエンドポイントプール

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{Endpoint, PrefillError};
use crate::ports::{EndpointDiscovery, EndpointPool};

/// Discovers endpoints once and serves them to every app of the run.
///
/// Concurrent callers of `ensure_populated` serialize on `populate`, so a
/// burst of benchmark workers triggers a single discovery. A failed
/// discovery leaves the pool empty and the next caller tries again.
pub struct CachedEndpointPool {
    discovery: Arc<dyn EndpointDiscovery>,
    endpoints: RwLock<Vec<Endpoint>>,
    populate: Mutex<()>,
}

impl CachedEndpointPool {
    pub fn new(discovery: Arc<dyn EndpointDiscovery>) -> Self {
        Self {
            discovery,
            endpoints: RwLock::new(Vec::new()),
            populate: Mutex::new(()),
        }
    }

    fn is_populated(&self) -> bool {
        !self.endpoints.read().is_empty()
    }
}

#[async_trait]
impl EndpointPool for CachedEndpointPool {
    async fn ensure_populated(&self) -> Result<(), PrefillError> {
        if self.is_populated() {
            return Ok(());
        }

        let _guard = self.populate.lock().await;
        if self.is_populated() {
            debug!("endpoint pool populated by a concurrent caller");
            return Ok(());
        }

        let mut found = self.discovery.discover().await?;
        // first occurrence wins, discovery order is kept
        let mut seen = HashSet::new();
        found.retain(|endpoint| seen.insert(endpoint.clone()));
        if found.is_empty() {
            return Err(PrefillError::EndpointDiscovery(
                "discovery returned no endpoints".to_string(),
            ));
        }

        info!(count = found.len(), "endpoint pool populated");
        *self.endpoints.write() = found;
        Ok(())
    }

    fn snapshot(&self) -> Vec<Endpoint> {
        self.endpoints.read().clone()
    }
}
