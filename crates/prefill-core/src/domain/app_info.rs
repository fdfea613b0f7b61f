//! App metadata and the work units derived from it.

use serde::{Deserialize, Serialize};

use super::ids::{AppId, DepotId};

/// Metadata for one application, as returned by the metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub id: AppId,
    pub name: String,
    #[serde(default)]
    pub depots: Vec<DepotInfo>,
    #[serde(default)]
    pub is_dlc: bool,
}

/// One depot of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepotInfo {
    pub id: DepotId,
    /// Manifest currently published for this depot.
    pub manifest_id: u64,
    /// Set when the depot's content is served from another app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_app_id: Option<AppId>,
    #[serde(default)]
    pub operating_systems: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One chunk request produced by the queue builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    pub depot_id: DepotId,
    pub chunk_id: String,
    pub compressed_length: u64,
}

/// Total compressed size of a queue.
pub fn queued_bytes(requests: &[QueuedRequest]) -> u64 {
    requests.iter().map(|r| r.compressed_length).sum()
}

/// A CDN endpoint the chunks are fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    80
}

/// What the transfer executor reports for a completed app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub bytes_transferred: u64,
}
