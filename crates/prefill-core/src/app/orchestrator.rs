//! PrefillOrchestrator - 本番実行（逐次）
//!
//! # 責務
//! - 権利スナップショットと対象アプリ集合の取得
//! - 対象アプリを一つずつパイプラインへ流す
//! - アプリ単位の失敗は記録して次へ、致命的エラーは即座に中断
//! - 終了時にサマリーを出力
//!
//! Apps are processed strictly one after another: the transfer executor
//! already saturates the cache on its own, and a second app in flight would
//! only compete with it.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::builder::PrefillApp;
use super::pipeline::PipelineMode;
use super::summary::{RunSummary, SummaryAggregator, log_outcomes, with_outcome};
use crate::config::RunOptions;
use crate::domain::{AppOutcome, AppResult, PrefillError};

/// Per-app results of a live run, in processing order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub apps: Vec<AppResult>,
}

impl RunReport {
    pub fn unowned(&self) -> impl Iterator<Item = &AppResult> {
        self.with_outcome(AppOutcome::Unowned)
    }

    pub fn failed(&self) -> impl Iterator<Item = &AppResult> {
        self.with_outcome(AppOutcome::Failed)
    }

    fn with_outcome(&self, outcome: AppOutcome) -> impl Iterator<Item = &AppResult> {
        with_outcome(&self.apps, outcome)
    }
}

pub struct PrefillOrchestrator {
    app: PrefillApp,
}

impl PrefillOrchestrator {
    pub fn new(app: PrefillApp) -> Self {
        Self { app }
    }

    /// Runs every target app once.
    ///
    /// Returns `Err` for run-fatal errors raised by an app, and for any error
    /// while loading entitlements or targets (a corrupt selection file
    /// included), since no app has been processed yet. After a fatal error
    /// the apps processed so far are logged but not reported.
    pub async fn run(
        &self,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PrefillError> {
        let (entitlements, targets) = self.app.load_targets(&options.targets).await?;
        let pipeline = self.app.pipeline(entitlements);
        let mode = PipelineMode::Live {
            force: options.force,
            no_download: options.no_download,
        };
        info!(
            apps = targets.len(),
            force = options.force,
            no_download = options.no_download,
            "starting prefill"
        );

        let mut aggregator = SummaryAggregator::new();
        let mut apps = Vec::with_capacity(targets.len());
        for app_id in targets {
            if cancel.is_cancelled() {
                warn!(processed = apps.len(), "prefill cancelled");
                return Err(PrefillError::Cancelled);
            }

            let output = pipeline.run_isolated(app_id, mode).await?;
            aggregator.record(&output.result);
            apps.push(output.result);
        }

        let report = RunReport {
            summary: aggregator.finish(),
            apps,
        };
        log_outcomes(&report.apps, &report.summary);
        Ok(report)
    }
}
