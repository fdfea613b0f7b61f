//! BenchmarkCapture - ベンチマーク用ワークロードの収集
//!
//! Runs the pipeline in capture mode over every target app with a bounded
//! number of apps in flight, then writes the collected chunk queues as one
//! JSON artifact for the replay tool. Nothing is transferred and success
//! state is never touched.
//!
//! Concurrency is bounded by a semaphore; a run-fatal error from any worker
//! cancels the rest and is returned as-is.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::builder::PrefillApp;
use super::pipeline::{PipelineMode, PipelineOutput};
use super::summary::{RunSummary, SummaryAggregator, log_outcomes, with_outcome};
use crate::config::TargetOptions;
use crate::domain::{
    AppId, AppOutcome, AppResult, AppWorkload, BenchmarkWorkload, PrefillError,
};
use crate::impls::fs::write_json_atomic;

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub output_path: PathBuf,
    /// Apps with a non-empty queue, i.e. the apps in the artifact.
    pub captured: usize,
    pub requests: usize,
    pub total_bytes: u64,
    pub summary: RunSummary,
    /// Every processed app, sorted by id.
    pub apps: Vec<AppResult>,
}

impl BenchmarkReport {
    pub fn unowned(&self) -> impl Iterator<Item = &AppResult> {
        with_outcome(&self.apps, AppOutcome::Unowned)
    }

    pub fn failed(&self) -> impl Iterator<Item = &AppResult> {
        with_outcome(&self.apps, AppOutcome::Failed)
    }
}

pub struct BenchmarkCapture {
    app: PrefillApp,
}

impl BenchmarkCapture {
    pub fn new(app: PrefillApp) -> Self {
        Self { app }
    }

    pub async fn run(
        &self,
        targets: &TargetOptions,
        cancel: &CancellationToken,
    ) -> Result<BenchmarkReport, PrefillError> {
        let (entitlements, app_ids) = self.app.load_targets(targets).await?;
        let pipeline = self.app.pipeline(entitlements);
        let limit = self.app.config().benchmark_concurrency();
        info!(apps = app_ids.len(), concurrency = limit, "capturing benchmark workload");

        let permits = Arc::new(Semaphore::new(limit));
        let captured: Arc<Mutex<Vec<AppWorkload>>> = Arc::new(Mutex::new(Vec::new()));
        let workers = cancel.child_token();

        let mut set = JoinSet::new();
        let mut task_apps: HashMap<tokio::task::Id, AppId> = HashMap::new();
        for app_id in app_ids {
            let pipeline = pipeline.clone();
            let permits = Arc::clone(&permits);
            let captured = Arc::clone(&captured);
            let token = workers.clone();

            let handle = set.spawn(async move {
                let output = tokio::select! {
                    _ = token.cancelled() => Err(PrefillError::Cancelled),
                    outcome = async {
                        let _permit = permits
                            .acquire_owned()
                            .await
                            .map_err(|_| PrefillError::Cancelled)?;
                        pipeline.run_isolated(app_id, PipelineMode::Capture).await
                    } => outcome,
                }?;
                if let Some(workload) = &output.captured {
                    debug!(%app_id, requests = workload.queued_requests.len(), "workload captured");
                    captured.lock().push(workload.clone());
                }
                Ok::<PipelineOutput, PrefillError>(output)
            });
            task_apps.insert(handle.id(), app_id);
        }

        let mut aggregator = SummaryAggregator::new();
        let mut results = Vec::new();
        while let Some(joined) = set.join_next_with_id().await {
            let output = match joined {
                Ok((_, Ok(output))) => output,
                Ok((_, Err(e))) => {
                    workers.cancel();
                    set.abort_all();
                    return Err(e);
                }
                Err(join_err) => {
                    let app_id = task_apps.get(&join_err.id()).copied();
                    error!(app_id = ?app_id, error = %join_err, "capture task panicked");
                    match app_id {
                        Some(app_id) => PipelineOutput {
                            result: AppResult::failed(app_id),
                            captured: None,
                        },
                        None => continue,
                    }
                }
            };
            aggregator.record(&output.result);
            results.push(output.result);
        }
        results.sort_by_key(|r: &AppResult| r.app_id);

        if cancel.is_cancelled() {
            return Err(PrefillError::Cancelled);
        }

        let apps = std::mem::take(&mut *captured.lock());
        let workload = BenchmarkWorkload::new(self.app.endpoints().snapshot(), apps);
        let output_path = self.app.config().benchmark.output_path.clone();
        write_json_atomic(&output_path, &workload).await?;

        let report = BenchmarkReport {
            output_path,
            captured: workload.apps.len(),
            requests: workload.request_count(),
            total_bytes: workload.total_compressed_bytes,
            summary: aggregator.finish(),
            apps: results,
        };
        log_outcomes(&report.apps, &report.summary);
        info!(
            path = %report.output_path.display(),
            apps = report.captured,
            requests = report.requests,
            bytes = report.total_bytes,
            "benchmark workload written"
        );
        Ok(report)
    }
}
