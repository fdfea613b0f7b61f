//! PrefillBuilder - コラボレータのワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンで `Arc<dyn Port>` を一箇所に集める
//! - 起動時検証（Fail-fast）: 足りないコラボレータは `build()` で報告
//!
//! The popularity source is the only optional collaborator; asking for
//! top-N targets without one is a run-time error instead.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::entitlement_cache::EntitlementCache;
use super::pipeline::AppPipeline;
use super::selection_store::SelectionStore;
use super::targets::TargetResolver;
use crate::config::{PrefillConfig, TargetOptions};
use crate::domain::{AppId, EntitlementSnapshot, PrefillError};
use crate::ports::{
    AppMetadataService, DepotQueueBuilder, DownloadExecutor, EndpointPool, PopularAppsSource,
    ProductInfoService, SessionClient, SuccessStateStore,
};

/// PrefillBuilder は PrefillApp を構築
///
/// # 使用例
/// ```ignore
/// let app = PrefillBuilder::new(config)
///     .session(session)
///     .product_info(product_info)
///     .metadata(metadata)
///     .depots(depots)
///     .endpoints(pool)
///     .executor(executor)
///     .success_state(store)
///     .build()?;
/// ```
pub struct PrefillBuilder {
    config: Arc<PrefillConfig>,
    session: Option<Arc<dyn SessionClient>>,
    product_info: Option<Arc<dyn ProductInfoService>>,
    metadata: Option<Arc<dyn AppMetadataService>>,
    depots: Option<Arc<dyn DepotQueueBuilder>>,
    endpoints: Option<Arc<dyn EndpointPool>>,
    executor: Option<Arc<dyn DownloadExecutor>>,
    success: Option<Arc<dyn SuccessStateStore>>,
    popular: Option<Arc<dyn PopularAppsSource>>,
}

/// BuildError はワイヤリング不足
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing collaborators: {0:?}")]
    MissingCollaborators(Vec<&'static str>),
}

impl PrefillBuilder {
    pub fn new(config: impl Into<Arc<PrefillConfig>>) -> Self {
        Self {
            config: config.into(),
            session: None,
            product_info: None,
            metadata: None,
            depots: None,
            endpoints: None,
            executor: None,
            success: None,
            popular: None,
        }
    }

    pub fn session(mut self, session: Arc<dyn SessionClient>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn product_info(mut self, product_info: Arc<dyn ProductInfoService>) -> Self {
        self.product_info = Some(product_info);
        self
    }

    pub fn metadata(mut self, metadata: Arc<dyn AppMetadataService>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn depots(mut self, depots: Arc<dyn DepotQueueBuilder>) -> Self {
        self.depots = Some(depots);
        self
    }

    pub fn endpoints(mut self, endpoints: Arc<dyn EndpointPool>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn DownloadExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn success_state(mut self, success: Arc<dyn SuccessStateStore>) -> Self {
        self.success = Some(success);
        self
    }

    pub fn popular(mut self, popular: Arc<dyn PopularAppsSource>) -> Self {
        self.popular = Some(popular);
        self
    }

    /// 全コラボレータが揃っているか検証して PrefillApp を生成
    pub fn build(self) -> Result<PrefillApp, BuildError> {
        let mut missing = Vec::new();
        if self.session.is_none() {
            missing.push("session");
        }
        if self.product_info.is_none() {
            missing.push("product_info");
        }
        if self.metadata.is_none() {
            missing.push("metadata");
        }
        if self.depots.is_none() {
            missing.push("depots");
        }
        if self.endpoints.is_none() {
            missing.push("endpoints");
        }
        if self.executor.is_none() {
            missing.push("executor");
        }
        if self.success.is_none() {
            missing.push("success_state");
        }

        match (
            self.session,
            self.product_info,
            self.metadata,
            self.depots,
            self.endpoints,
            self.executor,
            self.success,
        ) {
            (
                Some(session),
                Some(product_info),
                Some(metadata),
                Some(depots),
                Some(endpoints),
                Some(executor),
                Some(success),
            ) => Ok(PrefillApp {
                config: self.config,
                session,
                product_info,
                metadata,
                depots,
                endpoints,
                executor,
                success,
                popular: self.popular,
            }),
            _ => Err(BuildError::MissingCollaborators(missing)),
        }
    }
}

/// PrefillApp は配線済みのエンジン
///
/// Cheap to clone. Both schedulers start from here.
#[derive(Clone)]
pub struct PrefillApp {
    config: Arc<PrefillConfig>,
    session: Arc<dyn SessionClient>,
    product_info: Arc<dyn ProductInfoService>,
    metadata: Arc<dyn AppMetadataService>,
    depots: Arc<dyn DepotQueueBuilder>,
    endpoints: Arc<dyn EndpointPool>,
    executor: Arc<dyn DownloadExecutor>,
    success: Arc<dyn SuccessStateStore>,
    popular: Option<Arc<dyn PopularAppsSource>>,
}

impl PrefillApp {
    pub fn config(&self) -> &PrefillConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Arc<dyn EndpointPool> {
        &self.endpoints
    }

    pub fn selection(&self) -> SelectionStore {
        SelectionStore::new(self.config.selection_path())
    }

    /// Entitlements first, then targets. Any failure here ends the run,
    /// whatever its kind: no app has been processed yet.
    pub async fn load_targets(
        &self,
        options: &TargetOptions,
    ) -> Result<(Arc<EntitlementSnapshot>, BTreeSet<AppId>), PrefillError> {
        let licenses = self.session.licenses().await.map_err(|e| match e {
            e if e.is_fatal() => e,
            e => PrefillError::EntitlementQuery(e.to_string()),
        })?;

        let cache = EntitlementCache::new(self.config.entitlements_dir(), Arc::clone(&self.product_info));
        let snapshot = cache.refresh(&self.session.account_key(), &licenses).await?;

        let resolver = TargetResolver::new(Arc::clone(&self.session), self.popular.clone(), self.selection());
        let targets = resolver.resolve(options).await?;
        debug!(
            licenses = licenses.len(),
            targets = targets.len(),
            "entitlements and targets loaded"
        );
        Ok((snapshot, targets))
    }

    pub fn pipeline(&self, entitlements: Arc<EntitlementSnapshot>) -> AppPipeline {
        AppPipeline {
            config: Arc::clone(&self.config),
            entitlements,
            metadata: Arc::clone(&self.metadata),
            depots: Arc::clone(&self.depots),
            endpoints: Arc::clone(&self.endpoints),
            executor: Arc::clone(&self.executor),
            success: Arc::clone(&self.success),
        }
    }
}
