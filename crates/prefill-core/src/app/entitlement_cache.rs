//! EntitlementCache - アカウントごとの権利スナップショット
//!
//! Resolves which packages/apps/depots an account may access and keeps the
//! answer on disk, one file per account. The product-info query is the
//! expensive part, so a persisted snapshot is reused as long as the number
//! of non-expired licenses has not moved.
//!
//! Known approximation: a same-count swap (one license gone, another added)
//! is not detected. Only the count is compared; content is never
//! re-verified.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{EntitlementSnapshot, License, Package, PrefillError};
use crate::impls::fs::{read_json, write_json_atomic};
use crate::ports::{PackageRequest, ProductInfoService};

pub struct EntitlementCache {
    dir: PathBuf,
    product_info: Arc<dyn ProductInfoService>,
}

impl EntitlementCache {
    pub fn new(dir: impl Into<PathBuf>, product_info: Arc<dyn ProductInfoService>) -> Self {
        Self {
            dir: dir.into(),
            product_info,
        }
    }

    /// One file per account. Bytes outside `[A-Za-z0-9_-]` are written as
    /// `%XX`, so distinct keys never share a file.
    pub fn snapshot_path(&self, account_key: &str) -> PathBuf {
        let mut file = String::with_capacity(account_key.len());
        for b in account_key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                file.push(char::from(b));
            } else {
                file.push_str(&format!("%{b:02X}"));
            }
        }
        self.dir.join(format!("{file}.json"))
    }

    /// Best-effort read. Unreadable or corrupt files count as "not cached".
    pub async fn load(&self, account_key: &str) -> Option<EntitlementSnapshot> {
        let path = self.snapshot_path(account_key);
        match read_json(&path, "entitlement snapshot").await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable entitlement snapshot");
                None
            }
        }
    }

    /// Returns the snapshot for the given licenses, querying the product-info
    /// service only when the persisted one is absent or stale.
    pub async fn refresh(
        &self,
        account_key: &str,
        licenses: &[License],
    ) -> Result<Arc<EntitlementSnapshot>, PrefillError> {
        let active: Vec<&License> = licenses.iter().filter(|l| !l.expired).collect();

        if let Some(cached) = self.load(account_key).await {
            if !cached.is_stale_for(active.len()) {
                debug!(licenses = active.len(), "entitlement snapshot is current");
                return Ok(Arc::new(cached));
            }
            info!(
                cached = cached.license_count,
                current = active.len(),
                "license count changed, rebuilding entitlements"
            );
        }

        let requests: Vec<PackageRequest> = active
            .iter()
            .map(|l| PackageRequest {
                package_id: l.package_id,
                access_token: l.access_token,
            })
            .collect();

        let infos = self
            .product_info
            .query_packages(&requests)
            .await
            .map_err(|e| match e {
                e if e.is_fatal() => e,
                e => PrefillError::EntitlementQuery(e.to_string()),
            })?;

        let now = Utc::now();
        let snapshot = EntitlementSnapshot::from_packages(
            active.len(),
            infos
                .into_iter()
                .map(|info| Package::from_product_info(info, now)),
        );

        write_json_atomic(&self.snapshot_path(account_key), &snapshot).await?;
        info!(
            licenses = snapshot.license_count,
            apps = snapshot.owned_app_ids.len(),
            depots = snapshot.owned_depot_ids.len(),
            "entitlement snapshot rebuilt"
        );
        Ok(Arc::new(snapshot))
    }
}
