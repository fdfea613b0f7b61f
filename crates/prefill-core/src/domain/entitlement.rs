//! Entitlement model: licenses, packages and the per-account snapshot.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AppId, DepotId, PackageId};

/// One license as reported by the session client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub package_id: PackageId,
    pub access_token: u64,
    #[serde(default)]
    pub expired: bool,
}

/// Raw product-info answer for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageProductInfo {
    pub id: PackageId,
    #[serde(default)]
    pub app_ids: Vec<AppId>,
    #[serde(default)]
    pub depot_ids: Vec<DepotId>,
    #[serde(default)]
    pub is_free_weekend: bool,
    /// End of the promotional window, if the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Explicit expiry flag; wins over `expires_at` when set.
    #[serde(default)]
    pub expired: bool,
}

/// Transient package record used while building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: PackageId,
    pub app_ids: Vec<AppId>,
    pub depot_ids: Vec<DepotId>,
    pub is_free_weekend: bool,
    pub free_weekend_expired: bool,
}

impl Package {
    pub fn from_product_info(info: PackageProductInfo, now: DateTime<Utc>) -> Self {
        let window_closed = info.expires_at.is_some_and(|at| at <= now);
        Self {
            id: info.id,
            app_ids: info.app_ids,
            depot_ids: info.depot_ids,
            is_free_weekend: info.is_free_weekend,
            free_weekend_expired: info.is_free_weekend && (info.expired || window_closed),
        }
    }

    /// Expired free-weekend grants contribute nothing to a snapshot.
    pub fn grants_access(&self) -> bool {
        !(self.is_free_weekend && self.free_weekend_expired)
    }
}

/// Which content ids an account may access.
///
/// Built once per staleness event, replaced wholesale on refresh, and shared
/// read-only (`Arc`) for the remainder of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSnapshot {
    /// Number of non-expired licenses this snapshot was built from.
    pub license_count: usize,
    pub owned_package_ids: HashSet<PackageId>,
    pub owned_app_ids: HashSet<AppId>,
    pub owned_depot_ids: HashSet<DepotId>,
}

impl EntitlementSnapshot {
    pub fn from_packages(license_count: usize, packages: impl IntoIterator<Item = Package>) -> Self {
        let mut snapshot = Self {
            license_count,
            ..Self::default()
        };
        for package in packages.into_iter().filter(Package::grants_access) {
            snapshot.owned_package_ids.insert(package.id);
            snapshot.owned_app_ids.extend(package.app_ids);
            snapshot.owned_depot_ids.extend(package.depot_ids);
        }
        snapshot
    }

    pub fn has_app_access(&self, app_id: AppId) -> bool {
        self.owned_app_ids.contains(&app_id)
    }

    pub fn has_depot_access(&self, depot_id: DepotId) -> bool {
        self.owned_depot_ids.contains(&depot_id)
    }

    /// A snapshot is stale once the non-expired license count moves.
    pub fn is_stale_for(&self, active_licenses: usize) -> bool {
        self.license_count != active_licenses
    }
}
