//! Summary - 実行結果の集計
//!
//! Counters over per-app outcomes. Each app is recorded exactly once; the
//! summary is rendered at the end of a run and never persisted.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{AppOutcome, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub updated: usize,
    pub already_up_to_date: usize,
    pub no_depots_matched: usize,
    pub failed_apps: usize,
    pub unowned_apps_skipped: usize,
    pub bytes_transferred: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.updated
            + self.already_up_to_date
            + self.no_depots_matched
            + self.failed_apps
            + self.unowned_apps_skipped
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Prefill complete in {:.1}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "  updated:            {}", self.updated)?;
        writeln!(f, "  already up to date: {}", self.already_up_to_date)?;
        writeln!(f, "  no matching depots: {}", self.no_depots_matched)?;
        writeln!(f, "  failed:             {}", self.failed_apps)?;
        writeln!(f, "  unowned (skipped):  {}", self.unowned_apps_skipped)?;
        write!(f, "  downloaded:         {}", format_bytes(self.bytes_transferred))
    }
}

/// Accumulates a [`RunSummary`] while a run is in progress.
#[derive(Debug)]
pub struct SummaryAggregator {
    summary: RunSummary,
    started: Instant,
}

impl SummaryAggregator {
    pub fn new() -> Self {
        Self {
            summary: RunSummary::default(),
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, result: &AppResult) {
        let s = &mut self.summary;
        match result.outcome {
            AppOutcome::Updated => s.updated += 1,
            AppOutcome::AlreadyUpToDate => s.already_up_to_date += 1,
            AppOutcome::NoDepotsMatched => s.no_depots_matched += 1,
            AppOutcome::Failed => s.failed_apps += 1,
            AppOutcome::Unowned => s.unowned_apps_skipped += 1,
        }
        s.bytes_transferred += result.bytes_transferred;
    }

    pub fn finish(mut self) -> RunSummary {
        self.summary.elapsed = self.started.elapsed();
        self.summary
    }
}

impl Default for SummaryAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Results with the given outcome, in the order given.
pub fn with_outcome(results: &[AppResult], outcome: AppOutcome) -> impl Iterator<Item = &AppResult> {
    results.iter().filter(move |r| r.outcome == outcome)
}

/// End-of-run output shared by the live run and the benchmark capture:
/// unowned apps by name, each failed app, then the summary.
pub(crate) fn log_outcomes(results: &[AppResult], summary: &RunSummary) {
    let unowned: Vec<&str> = with_outcome(results, AppOutcome::Unowned)
        .map(|r| r.name.as_str())
        .collect();
    if !unowned.is_empty() {
        warn!(count = unowned.len(), apps = ?unowned, "skipped apps this account does not own");
    }
    for failed in with_outcome(results, AppOutcome::Failed) {
        error!(app_id = %failed.app_id, name = %failed.name, "app failed");
    }
    info!("{summary}");
}

/// Binary-unit byte count, e.g. `1.50 GiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
