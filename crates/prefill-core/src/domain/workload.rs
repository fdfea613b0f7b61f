//! Benchmark workload artifact.
//!
//! Consumed by a separate replay tool, so field names are part of the
//! external format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::app_info::{Endpoint, QueuedRequest, queued_bytes};
use super::ids::AppId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppWorkload {
    pub name: String,
    pub id: AppId,
    pub queued_requests: Vec<QueuedRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkWorkload {
    pub created_at: DateTime<Utc>,
    pub endpoints: Vec<Endpoint>,
    pub total_compressed_bytes: u64,
    pub apps: Vec<AppWorkload>,
}

impl BenchmarkWorkload {
    /// Apps are sorted by id; workers append in completion order.
    pub fn new(endpoints: Vec<Endpoint>, mut apps: Vec<AppWorkload>) -> Self {
        apps.sort_by_key(|a| a.id);
        let total_compressed_bytes = apps.iter().map(|a| queued_bytes(&a.queued_requests)).sum();
        Self {
            created_at: Utc::now(),
            endpoints,
            total_compressed_bytes,
            apps,
        }
    }

    pub fn request_count(&self) -> usize {
        self.apps.iter().map(|a| a.queued_requests.len()).sum()
    }
}
