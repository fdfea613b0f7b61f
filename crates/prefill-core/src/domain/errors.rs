//! Errors - エラー型と分類
//!
//! Every error raised inside one app's pipeline is classified by
//! [`PrefillError::kind`]. Schedulers (the sequential live run and the
//! bounded benchmark pool) look only at the kind: `Fatal` aborts the whole
//! run, `PerApp` is logged and counted against that app.

use std::path::PathBuf;

use thiserror::Error;

use super::ids::AppId;

/// ErrorKind は実行エラーの分類
///
/// - Fatal: the run cannot continue (cache gone, user abort, retry loop,
///   entitlements unknown).
/// - PerApp: isolated to the app being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fatal,
    PerApp,
}

#[derive(Debug, Error)]
pub enum PrefillError {
    #[error("lancache server unreachable: {0}")]
    CacheUnreachable(String),

    #[error("run cancelled by user")]
    Cancelled,

    #[error("download of {app_id} is stuck in a retry loop: {detail}")]
    InfiniteRetry { app_id: AppId, detail: String },

    #[error("entitlement query failed: {0}")]
    EntitlementQuery(String),

    #[error("no metadata returned for {0}")]
    MetadataMissing(AppId),

    #[error("endpoint discovery failed: {0}")]
    EndpointDiscovery(String),

    #[error("{service} call failed: {message}")]
    Service {
        service: &'static str,
        message: String,
    },

    #[error("transfer failed for {app_id}: {message}")]
    Transfer { app_id: AppId, message: String },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {what} in {}: {source}", path.display())]
    Parse {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PrefillError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrefillError::CacheUnreachable(_)
            | PrefillError::Cancelled
            | PrefillError::InfiniteRetry { .. }
            | PrefillError::EntitlementQuery(_) => ErrorKind::Fatal,
            _ => ErrorKind::PerApp,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        PrefillError::Service {
            service,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrefillError::Io {
            path: path.into(),
            source,
        }
    }
}
