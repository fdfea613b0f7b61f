//! Domain model (ids, entitlements, app metadata, outcomes, errors).

pub mod app_info;
pub mod entitlement;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod workload;

pub use app_info::{AppInfo, DepotInfo, Endpoint, QueuedRequest, TransferReport, queued_bytes};
pub use entitlement::{EntitlementSnapshot, License, Package, PackageProductInfo};
pub use errors::{ErrorKind, PrefillError};
pub use ids::{AppId, DepotId, PackageId};
pub use outcome::{AppOutcome, AppResult};
pub use workload::{AppWorkload, BenchmarkWorkload};
