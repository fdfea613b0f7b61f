//! Run configuration.
//!
//! `PrefillConfig` is built once (from `prefill.toml` or defaults) and handed
//! to every component as `Arc<PrefillConfig>`. Per-invocation flags live in
//! [`RunOptions`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{AppId, PrefillError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefillConfig {
    /// Root for entitlements, selection and success state.
    pub state_dir: PathBuf,
    pub include_dlc: bool,
    pub depots: DepotCriteria,
    pub benchmark: BenchmarkConfig,
}

/// Operator's depot selection criteria.
///
/// Empty / `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotCriteria {
    pub operating_systems: Vec<String>,
    pub architecture: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Apps captured concurrently.
    pub concurrency: usize,
    pub output_path: PathBuf,
}

impl Default for PrefillConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".prefill"),
            include_dlc: true,
            depots: DepotCriteria {
                operating_systems: vec!["windows".to_string()],
                architecture: Some("64".to_string()),
                language: Some("english".to_string()),
            },
            benchmark: BenchmarkConfig::default(),
        }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            output_path: PathBuf::from("benchmark.json"),
        }
    }
}

impl PrefillConfig {
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            ..Self::default()
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|e| PrefillError::io(path, e))?;
        toml::from_str(&s).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Missing file means defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn entitlements_dir(&self) -> PathBuf {
        self.state_dir.join("entitlements")
    }

    pub fn selection_path(&self) -> PathBuf {
        self.state_dir.join("selected_apps.json")
    }

    pub fn success_state_path(&self) -> PathBuf {
        self.state_dir.join("success_state.json")
    }

    /// Worker cap; a zero in the file is treated as one.
    pub fn benchmark_concurrency(&self) -> usize {
        self.benchmark.concurrency.max(1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Read(#[from] PrefillError),

    #[error("invalid config {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Per-invocation flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Ignore persisted success state.
    pub force: bool,
    /// Stop after building the queue; nothing is transferred or persisted.
    pub no_download: bool,
    pub targets: TargetOptions,
}

/// Sources that feed the target application id set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOptions {
    pub manual: Vec<AppId>,
    pub all_owned: bool,
    pub recently_played: bool,
    pub top_popular: Option<usize>,
}
