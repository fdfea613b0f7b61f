//! Outcome model: one terminal result per processed app per run.

use serde::{Deserialize, Serialize};

use super::ids::AppId;

/// Terminal result of running one app through the pipeline.
///
/// `NoDepotsMatched`, `AlreadyUpToDate` and `Unowned` are normal outcomes,
/// not errors. `Failed` is only ever produced at the per-app boundary of a
/// scheduler, never by the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppOutcome {
    Updated,
    AlreadyUpToDate,
    NoDepotsMatched,
    Failed,
    Unowned,
}

impl AppOutcome {
    pub fn is_soft_skip(self) -> bool {
        matches!(
            self,
            AppOutcome::AlreadyUpToDate | AppOutcome::NoDepotsMatched | AppOutcome::Unowned
        )
    }
}

/// The outcome of one app together with the name shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppResult {
    pub app_id: AppId,
    /// Falls back to the id when metadata never resolved.
    pub name: String,
    pub outcome: AppOutcome,
    #[serde(default)]
    pub bytes_transferred: u64,
}

impl AppResult {
    pub fn new(app_id: AppId, name: impl Into<String>, outcome: AppOutcome) -> Self {
        Self {
            app_id,
            name: name.into(),
            outcome,
            bytes_transferred: 0,
        }
    }

    pub fn failed(app_id: AppId) -> Self {
        Self::new(app_id, app_id.to_string(), AppOutcome::Failed)
    }

    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes_transferred = bytes;
        self
    }
}
