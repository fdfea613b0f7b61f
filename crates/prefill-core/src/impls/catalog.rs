//! CatalogBackend - JSON カタログによるオフライン実装
//!
//! A single JSON document describes an account, its licenses, the package
//! and app metadata, the CDN endpoints and the chunk lists of each depot.
//! `CatalogBackend` implements every port on top of it, so the engine can
//! be driven end to end without the network client. Downloaded chunks are
//! remembered for the lifetime of the backend, which makes a forced rerun
//! see an empty queue just like a warm cache would.
//!
//! ```json
//! {
//!   "account": "alice",
//!   "licenses": [{"packageId": 10, "accessToken": 0}],
//!   "packages": [{"id": 10, "appIds": [440], "depotIds": [441]}],
//!   "apps": [{"id": 440, "name": "Game", "depots": [{"id": 441, "manifestId": 7}]}],
//!   "endpoints": [{"host": "lancache.local"}],
//!   "chunks": {"441": [{"chunkId": "a1", "compressedLength": 1048576}]}
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::fs::read_json;
use crate::config::DepotCriteria;
use crate::domain::{
    AppId, AppInfo, DepotId, DepotInfo, Endpoint, License, PackageProductInfo, PrefillError,
    QueuedRequest, TransferReport,
};
use crate::ports::{
    AppMetadataService, DepotQueueBuilder, DownloadExecutor, EndpointDiscovery, LookupOptions,
    PackageRequest, PopularAppsSource, ProductInfoService, SessionClient,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Catalog {
    pub account: String,
    pub licenses: Vec<License>,
    pub packages: Vec<PackageProductInfo>,
    pub apps: Vec<CatalogApp>,
    pub recently_played: Vec<AppId>,
    /// Most popular first.
    pub popular: Vec<AppId>,
    pub endpoints: Vec<Endpoint>,
    pub chunks: HashMap<DepotId, Vec<CatalogChunk>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogApp {
    #[serde(flatten)]
    pub info: AppInfo,
    /// DLC apps whose depots are folded in when DLC is included.
    #[serde(default)]
    pub dlc: Vec<AppId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogChunk {
    pub chunk_id: String,
    pub compressed_length: u64,
}

pub struct CatalogBackend {
    catalog: Catalog,
    apps: HashMap<AppId, CatalogApp>,
    cached: Mutex<HashSet<(DepotId, String)>>,
}

impl CatalogBackend {
    pub fn new(catalog: Catalog) -> Self {
        let apps = catalog
            .apps
            .iter()
            .map(|a| (a.info.id, a.clone()))
            .collect();
        Self {
            catalog,
            apps,
            cached: Mutex::new(HashSet::new()),
        }
    }

    pub async fn load(path: &Path) -> Result<Self, PrefillError> {
        let catalog: Catalog = read_json(path, "catalog").await?.ok_or_else(|| {
            PrefillError::io(path, std::io::Error::from(std::io::ErrorKind::NotFound))
        })?;
        debug!(
            path = %path.display(),
            apps = catalog.apps.len(),
            packages = catalog.packages.len(),
            "catalog loaded"
        );
        Ok(Self::new(catalog))
    }

    fn active_packages(&self) -> impl Iterator<Item = &PackageProductInfo> {
        let licensed: HashSet<_> = self
            .catalog
            .licenses
            .iter()
            .filter(|l| !l.expired)
            .map(|l| l.package_id)
            .collect();
        self.catalog
            .packages
            .iter()
            .filter(move |p| licensed.contains(&p.id))
    }
}

fn matches_criteria(depot: &DepotInfo, criteria: &DepotCriteria) -> bool {
    let os_ok = criteria.operating_systems.is_empty()
        || depot.operating_systems.is_empty()
        || depot
            .operating_systems
            .iter()
            .any(|os| criteria.operating_systems.iter().any(|want| want.eq_ignore_ascii_case(os)));
    let arch_ok = match (&criteria.architecture, &depot.architecture) {
        (Some(want), Some(have)) => want == have,
        _ => true,
    };
    let lang_ok = match (&criteria.language, &depot.language) {
        (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
        _ => true,
    };
    os_ok && arch_ok && lang_ok
}

#[async_trait]
impl SessionClient for CatalogBackend {
    fn account_key(&self) -> String {
        self.catalog.account.clone()
    }

    async fn licenses(&self) -> Result<Vec<License>, PrefillError> {
        Ok(self.catalog.licenses.clone())
    }

    async fn owned_app_ids(&self) -> Result<Vec<AppId>, PrefillError> {
        Ok(self
            .active_packages()
            .flat_map(|p| p.app_ids.iter().copied())
            .collect())
    }

    async fn recently_played_app_ids(&self) -> Result<Vec<AppId>, PrefillError> {
        Ok(self.catalog.recently_played.clone())
    }
}

#[async_trait]
impl ProductInfoService for CatalogBackend {
    async fn query_packages(
        &self,
        requests: &[PackageRequest],
    ) -> Result<Vec<PackageProductInfo>, PrefillError> {
        let wanted: HashSet<_> = requests.iter().map(|r| r.package_id).collect();
        Ok(self
            .catalog
            .packages
            .iter()
            .filter(|p| wanted.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AppMetadataService for CatalogBackend {
    async fn lookup(
        &self,
        ids: &[AppId],
        options: LookupOptions,
    ) -> Result<Vec<AppInfo>, PrefillError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.apps.get(id))
            .map(|entry| {
                let mut info = entry.info.clone();
                if options.include_dlc {
                    for dlc in entry.dlc.iter().filter_map(|id| self.apps.get(id)) {
                        info.depots.extend(dlc.info.depots.iter().cloned());
                    }
                }
                info
            })
            .collect())
    }
}

#[async_trait]
impl PopularAppsSource for CatalogBackend {
    async fn top(&self, n: usize) -> Result<Vec<AppId>, PrefillError> {
        Ok(self.catalog.popular.iter().take(n).copied().collect())
    }
}

#[async_trait]
impl DepotQueueBuilder for CatalogBackend {
    async fn filter_depots(
        &self,
        _app: &AppInfo,
        depots: Vec<DepotInfo>,
        criteria: &DepotCriteria,
    ) -> Result<Vec<DepotInfo>, PrefillError> {
        Ok(depots
            .into_iter()
            .filter(|d| matches_criteria(d, criteria))
            .collect())
    }

    async fn link_depots(
        &self,
        app: &AppInfo,
        depots: Vec<DepotInfo>,
    ) -> Result<Vec<DepotInfo>, PrefillError> {
        let mut linked = Vec::with_capacity(depots.len());
        for depot in depots {
            let Some(owner) = depot.linked_app_id else {
                linked.push(depot);
                continue;
            };
            let source = self
                .apps
                .get(&owner)
                .and_then(|a| a.info.depots.iter().find(|d| d.id == depot.id));
            match source {
                Some(source) => linked.push(DepotInfo {
                    manifest_id: source.manifest_id,
                    linked_app_id: None,
                    ..depot
                }),
                None => warn!(
                    app_id = %app.id,
                    depot_id = %depot.id,
                    owner = %owner,
                    "linked depot not found in its owning app, dropping"
                ),
            }
        }
        Ok(linked)
    }

    async fn build_queue(
        &self,
        _app: &AppInfo,
        depots: &[DepotInfo],
        _endpoints: &[Endpoint],
    ) -> Result<Vec<QueuedRequest>, PrefillError> {
        let cached = self.cached.lock();
        Ok(depots
            .iter()
            .flat_map(|d| {
                self.catalog
                    .chunks
                    .get(&d.id)
                    .into_iter()
                    .flatten()
                    .map(move |c| (d.id, c))
            })
            .filter(|(depot_id, c)| !cached.contains(&(*depot_id, c.chunk_id.clone())))
            .map(|(depot_id, c)| QueuedRequest {
                depot_id,
                chunk_id: c.chunk_id.clone(),
                compressed_length: c.compressed_length,
            })
            .collect())
    }
}

#[async_trait]
impl DownloadExecutor for CatalogBackend {
    async fn download(
        &self,
        app: &AppInfo,
        requests: &[QueuedRequest],
    ) -> Result<TransferReport, PrefillError> {
        let mut cached = self.cached.lock();
        for r in requests {
            cached.insert((r.depot_id, r.chunk_id.clone()));
        }
        debug!(app_id = %app.id, chunks = requests.len(), "chunks marked as cached");
        Ok(TransferReport {
            bytes_transferred: requests.iter().map(|r| r.compressed_length).sum(),
        })
    }
}

#[async_trait]
impl EndpointDiscovery for CatalogBackend {
    async fn discover(&self) -> Result<Vec<Endpoint>, PrefillError> {
        Ok(self.catalog.endpoints.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "account": "alice",
        "licenses": [
            {"packageId": 10, "accessToken": 1},
            {"packageId": 20, "accessToken": 2, "expired": true}
        ],
        "packages": [
            {"id": 10, "appIds": [440, 441], "depotIds": [4401, 4402, 4411]},
            {"id": 20, "appIds": [570], "depotIds": [5701]}
        ],
        "apps": [
            {"id": 440, "name": "Game", "dlc": [441], "depots": [
                {"id": 4401, "manifestId": 7, "operatingSystems": ["windows"]},
                {"id": 4402, "manifestId": 8, "operatingSystems": ["macos"]},
                {"id": 4403, "manifestId": 0, "linkedAppId": 228980}
            ]},
            {"id": 441, "name": "Game DLC", "isDlc": true, "depots": [
                {"id": 4411, "manifestId": 9, "language": "german"}
            ]}
        ],
        "endpoints": [{"host": "lancache.local"}],
        "chunks": {
            "4401": [
                {"chunkId": "a", "compressedLength": 100},
                {"chunkId": "b", "compressedLength": 50}
            ]
        }
    }"#;

    fn backend() -> CatalogBackend {
        CatalogBackend::new(serde_json::from_str(CATALOG).unwrap())
    }

    #[tokio::test]
    async fn owned_apps_come_from_unexpired_licenses() {
        let owned = backend().owned_app_ids().await.unwrap();
        assert_eq!(owned, vec![AppId::new(440), AppId::new(441)]);
    }

    #[tokio::test]
    async fn dlc_depots_fold_in_only_when_requested() {
        let b = backend();
        let with = b
            .lookup(&[AppId::new(440)], LookupOptions { include_dlc: true })
            .await
            .unwrap();
        let without = b
            .lookup(&[AppId::new(440), AppId::new(1)], LookupOptions { include_dlc: false })
            .await
            .unwrap();
        assert_eq!(with[0].depots.len(), 4);
        assert_eq!(without.len(), 1);
        assert_eq!(without[0].depots.len(), 3);
    }

    #[tokio::test]
    async fn criteria_and_links_narrow_the_depot_list() {
        let b = backend();
        let app = b
            .lookup(&[AppId::new(440)], LookupOptions { include_dlc: true })
            .await
            .unwrap()
            .remove(0);
        let criteria = DepotCriteria {
            operating_systems: vec!["windows".into()],
            architecture: Some("64".into()),
            language: Some("english".into()),
        };

        let filtered = b.filter_depots(&app, app.depots.clone(), &criteria).await.unwrap();
        let ids: Vec<_> = filtered.iter().map(|d| d.id.get()).collect();
        assert_eq!(ids, vec![4401, 4403]);

        let linked = b.link_depots(&app, filtered).await.unwrap();
        assert_eq!(linked.iter().map(|d| d.id.get()).collect::<Vec<_>>(), vec![4401]);
    }

    #[tokio::test]
    async fn downloaded_chunks_leave_the_queue() {
        let b = backend();
        let app = b
            .lookup(&[AppId::new(440)], LookupOptions::default())
            .await
            .unwrap()
            .remove(0);
        let depots = &app.depots[..1];

        let queue = b.build_queue(&app, depots, &[]).await.unwrap();
        assert_eq!(queue.len(), 2);

        let report = b.download(&app, &queue[..1]).await.unwrap();
        assert_eq!(report.bytes_transferred, 100);
        let rest = b.build_queue(&app, depots, &[]).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].chunk_id, "b");
    }

    #[tokio::test]
    async fn missing_catalog_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CatalogBackend::load(&dir.path().join("catalog.json")).await.err().unwrap();
        assert!(matches!(err, PrefillError::Io { .. }));
    }
}
