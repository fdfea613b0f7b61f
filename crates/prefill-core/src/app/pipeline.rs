//! AppPipeline - アプリ単位のパイプライン
//!
//! One function takes one app from id to terminal outcome. Both schedulers
//! call it: the live run strictly one app at a time, the benchmark capture
//! from a bounded worker pool, through [`AppPipeline::run_isolated`], which
//! puts the result behind the per-app boundary ([`isolate`]).
//!
//! # Steps
//! 1. resolve metadata, stop with `Unowned` if the account lacks access
//! 2. filter depots (entitlement + operator criteria), stop with
//!    `NoDepotsMatched` when nothing is left
//! 3. link depots served from other apps
//! 4. live only, unless forced: stop with `AlreadyUpToDate` when every
//!    depot's manifest matches the success state
//! 5. make sure the shared endpoint pool is populated
//! 6. build the chunk queue
//! 7. live only: transfer, then record success state

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::PrefillConfig;
use crate::domain::{
    AppId, AppInfo, AppOutcome, AppResult, AppWorkload, DepotInfo, EntitlementSnapshot,
    PrefillError, TransferReport, queued_bytes,
};
use crate::ports::{
    AppMetadataService, DepotQueueBuilder, DownloadExecutor, EndpointPool, LookupOptions,
    SuccessStateStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Full run: up-to-date check, transfer, success state.
    Live { force: bool, no_download: bool },
    /// Benchmark capture: stops after the queue is built.
    Capture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub result: AppResult,
    /// Only set in capture mode, and only for a non-empty queue.
    pub captured: Option<AppWorkload>,
}

impl PipelineOutput {
    fn done(app: &AppInfo, outcome: AppOutcome) -> Self {
        Self {
            result: AppResult::new(app.id, app.name.clone(), outcome),
            captured: None,
        }
    }
}

/// Per-app boundary shared by both schedulers.
///
/// Fatal errors pass through unchanged; anything else is logged and turned
/// into a `Failed` result so the run moves on. `name` is the display name if
/// metadata resolved before the failure.
pub fn isolate(
    app_id: AppId,
    name: Option<&str>,
    result: Result<PipelineOutput, PrefillError>,
) -> Result<PipelineOutput, PrefillError> {
    match result {
        Ok(output) => Ok(output),
        Err(e) if e.is_fatal() => {
            error!(%app_id, error = %e, "fatal error, aborting run");
            Err(e)
        }
        Err(e) => {
            warn!(
                %app_id,
                name = name.unwrap_or_default(),
                error = %e,
                "app failed, continuing with the next one"
            );
            let result = match name {
                Some(name) => AppResult::new(app_id, name, AppOutcome::Failed),
                None => AppResult::failed(app_id),
            };
            Ok(PipelineOutput {
                result,
                captured: None,
            })
        }
    }
}

/// Collaborators for one run. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AppPipeline {
    pub(crate) config: Arc<PrefillConfig>,
    pub(crate) entitlements: Arc<EntitlementSnapshot>,
    pub(crate) metadata: Arc<dyn AppMetadataService>,
    pub(crate) depots: Arc<dyn DepotQueueBuilder>,
    pub(crate) endpoints: Arc<dyn EndpointPool>,
    pub(crate) executor: Arc<dyn DownloadExecutor>,
    pub(crate) success: Arc<dyn SuccessStateStore>,
}

impl AppPipeline {
    pub async fn run(&self, app_id: AppId, mode: PipelineMode) -> Result<PipelineOutput, PrefillError> {
        let app = self.resolve(app_id).await?;
        self.process(&app, mode).await
    }

    /// `run` behind the per-app boundary; a failed app keeps its resolved name.
    pub async fn run_isolated(
        &self,
        app_id: AppId,
        mode: PipelineMode,
    ) -> Result<PipelineOutput, PrefillError> {
        let app = match self.resolve(app_id).await {
            Ok(app) => app,
            Err(e) => return isolate(app_id, None, Err(e)),
        };
        isolate(app_id, Some(&app.name), self.process(&app, mode).await)
    }

    async fn process(&self, app: &AppInfo, mode: PipelineMode) -> Result<PipelineOutput, PrefillError> {
        let app_id = app.id;
        if !self.entitlements.has_app_access(app_id) {
            info!(%app_id, name = %app.name, "not owned by this account, skipping");
            return Ok(PipelineOutput::done(app, AppOutcome::Unowned));
        }

        let accessible: Vec<DepotInfo> = app
            .depots
            .iter()
            .filter(|d| self.entitlements.has_depot_access(d.id))
            .cloned()
            .collect();
        let filtered = self
            .depots
            .filter_depots(app, accessible, &self.config.depots)
            .await?;
        if filtered.is_empty() {
            info!(%app_id, name = %app.name, "no depots match the selection criteria");
            return Ok(PipelineOutput::done(app, AppOutcome::NoDepotsMatched));
        }

        let linked = self.depots.link_depots(app, filtered).await?;
        if linked.is_empty() {
            info!(%app_id, name = %app.name, "no depots left after linking");
            return Ok(PipelineOutput::done(app, AppOutcome::NoDepotsMatched));
        }

        if let PipelineMode::Live { force: false, .. } = mode
            && self.is_up_to_date(&linked).await?
        {
            info!(%app_id, name = %app.name, "already up to date");
            return Ok(PipelineOutput::done(app, AppOutcome::AlreadyUpToDate));
        }

        self.endpoints.ensure_populated().await?;
        let endpoints = self.endpoints.snapshot();
        let queue = self.depots.build_queue(app, &linked, &endpoints).await?;
        debug!(
            %app_id,
            chunks = queue.len(),
            bytes = queued_bytes(&queue),
            "chunk queue built"
        );

        let no_download = match mode {
            PipelineMode::Capture => {
                let captured = (!queue.is_empty()).then(|| AppWorkload {
                    name: app.name.clone(),
                    id: app_id,
                    queued_requests: queue,
                });
                return Ok(PipelineOutput {
                    captured,
                    ..PipelineOutput::done(app, AppOutcome::Updated)
                });
            }
            PipelineMode::Live { no_download, .. } => no_download,
        };

        if no_download {
            info!(%app_id, name = %app.name, chunks = queue.len(), "download skipped");
            return Ok(PipelineOutput::done(app, AppOutcome::Updated));
        }

        let report = if queue.is_empty() {
            debug!(%app_id, "all content already cached");
            TransferReport::default()
        } else {
            info!(%app_id, name = %app.name, chunks = queue.len(), "downloading");
            self.executor.download(app, &queue).await?
        };

        let entries: Vec<_> = linked.iter().map(|d| (d.id, d.manifest_id)).collect();
        self.success.put_all(&entries).await?;

        info!(%app_id, name = %app.name, bytes = report.bytes_transferred, "updated");
        Ok(PipelineOutput {
            result: AppResult::new(app_id, app.name.clone(), AppOutcome::Updated)
                .with_bytes(report.bytes_transferred),
            captured: None,
        })
    }

    async fn resolve(&self, app_id: AppId) -> Result<AppInfo, PrefillError> {
        let options = LookupOptions {
            include_dlc: self.config.include_dlc,
        };
        self.metadata
            .lookup(&[app_id], options)
            .await?
            .into_iter()
            .find(|a| a.id == app_id)
            .ok_or(PrefillError::MetadataMissing(app_id))
    }

    async fn is_up_to_date(&self, depots: &[DepotInfo]) -> Result<bool, PrefillError> {
        for depot in depots {
            if self.success.get(depot.id).await? != Some(depot.manifest_id) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
