//! Scripted fakes of every port, shared by the unit tests.
//!
//! `World` wires them together: register apps with `with_app`, grant
//! ownership with `owning`, inject failures, then take either a full
//! `PrefillBuilder` or a bare `AppPipeline`.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::app::{AppPipeline, PrefillBuilder};
use crate::config::{DepotCriteria, PrefillConfig};
use crate::domain::{
    AppId, AppInfo, DepotId, DepotInfo, Endpoint, EntitlementSnapshot, License, Package,
    PackageId, PackageProductInfo, PrefillError, QueuedRequest, TransferReport, queued_bytes,
};
use crate::impls::{CachedEndpointPool, InMemorySuccessStore};
use crate::ports::{
    AppMetadataService, DepotQueueBuilder, DownloadExecutor, EndpointDiscovery, LookupOptions,
    PackageRequest, PopularAppsSource, ProductInfoService, SessionClient, SuccessStateStore,
};

type Failure = fn(AppId) -> PrefillError;

// ========================================
// Session / product info / popularity
// ========================================

pub struct FakeSession {
    account: String,
    licenses: Vec<License>,
    owned: Vec<AppId>,
    recent: Vec<AppId>,
    fail_licenses: bool,
}

impl FakeSession {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            licenses: Vec::new(),
            owned: Vec::new(),
            recent: Vec::new(),
            fail_licenses: false,
        }
    }

    pub fn with_licenses(mut self, licenses: Vec<License>) -> Self {
        self.licenses = licenses;
        self
    }

    pub fn with_owned(mut self, owned: Vec<AppId>) -> Self {
        self.owned = owned;
        self
    }

    pub fn with_recent(mut self, recent: Vec<AppId>) -> Self {
        self.recent = recent;
        self
    }

    pub fn failing_licenses(mut self) -> Self {
        self.fail_licenses = true;
        self
    }
}

#[async_trait]
impl SessionClient for FakeSession {
    fn account_key(&self) -> String {
        self.account.clone()
    }

    async fn licenses(&self) -> Result<Vec<License>, PrefillError> {
        if self.fail_licenses {
            return Err(PrefillError::service("session", "license list unavailable"));
        }
        Ok(self.licenses.clone())
    }

    async fn owned_app_ids(&self) -> Result<Vec<AppId>, PrefillError> {
        Ok(self.owned.clone())
    }

    async fn recently_played_app_ids(&self) -> Result<Vec<AppId>, PrefillError> {
        Ok(self.recent.clone())
    }
}

pub struct FakeProductInfo {
    packages: Vec<PackageProductInfo>,
    fail: bool,
    requests: Mutex<Vec<Vec<PackageRequest>>>,
}

impl FakeProductInfo {
    /// Answers with the known packages among those requested.
    pub fn new(packages: impl IntoIterator<Item = PackageProductInfo>) -> Self {
        Self {
            packages: packages.into_iter().collect(),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new([])
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Vec<PackageRequest> {
        self.requests.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ProductInfoService for FakeProductInfo {
    async fn query_packages(
        &self,
        requests: &[PackageRequest],
    ) -> Result<Vec<PackageProductInfo>, PrefillError> {
        self.requests.lock().push(requests.to_vec());
        if self.fail {
            return Err(PrefillError::service("product info", "request timed out"));
        }
        Ok(self
            .packages
            .iter()
            .filter(|p| requests.iter().any(|r| r.package_id == p.id))
            .cloned()
            .collect())
    }
}

pub struct FakePopular {
    ranking: Vec<AppId>,
}

impl FakePopular {
    pub fn new(ranking: Vec<AppId>) -> Self {
        Self { ranking }
    }
}

#[async_trait]
impl PopularAppsSource for FakePopular {
    async fn top(&self, n: usize) -> Result<Vec<AppId>, PrefillError> {
        Ok(self.ranking.iter().take(n).copied().collect())
    }
}

// ========================================
// Metadata + depot queue
// ========================================

/// One depot per id, manifest 1, matching the default criteria.
pub fn app_with_depots(id: u32, name: &str, depots: &[u32]) -> AppInfo {
    AppInfo {
        id: AppId::new(id),
        name: name.to_string(),
        depots: depots
            .iter()
            .map(|&d| DepotInfo {
                id: DepotId::new(d),
                manifest_id: 1,
                linked_app_id: None,
                operating_systems: vec!["windows".to_string()],
                architecture: Some("64".to_string()),
                language: Some("english".to_string()),
            })
            .collect(),
        is_dlc: false,
    }
}

/// Metadata service and queue builder in one; records every call per app.
#[derive(Default)]
pub struct FakeCatalog {
    apps: Mutex<HashMap<AppId, (AppInfo, u64)>>,
    queue_failures: Mutex<HashMap<AppId, Failure>>,
    calls: Mutex<HashMap<AppId, Vec<&'static str>>>,
    filtered: Mutex<HashMap<AppId, Vec<DepotId>>>,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeCatalog {
    pub fn calls_for(&self, app_id: AppId) -> Vec<&'static str> {
        self.calls.lock().get(&app_id).cloned().unwrap_or_default()
    }

    /// Depot ids handed to `filter_depots`, i.e. after the entitlement check.
    pub fn filtered_depots(&self, app_id: AppId) -> Vec<DepotId> {
        self.filtered.lock().get(&app_id).cloned().unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, app_id: AppId, call: &'static str) {
        self.calls.lock().entry(app_id).or_default().push(call);
    }
}

#[async_trait]
impl AppMetadataService for FakeCatalog {
    async fn lookup(
        &self,
        ids: &[AppId],
        _options: LookupOptions,
    ) -> Result<Vec<AppInfo>, PrefillError> {
        let apps = self.apps.lock();
        let mut found = Vec::new();
        for id in ids {
            self.record(*id, "lookup");
            if let Some((info, _)) = apps.get(id) {
                found.push(info.clone());
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl DepotQueueBuilder for FakeCatalog {
    async fn filter_depots(
        &self,
        app: &AppInfo,
        depots: Vec<DepotInfo>,
        _criteria: &DepotCriteria,
    ) -> Result<Vec<DepotInfo>, PrefillError> {
        self.record(app.id, "filter");
        self.filtered
            .lock()
            .insert(app.id, depots.iter().map(|d| d.id).collect());
        Ok(depots)
    }

    async fn link_depots(
        &self,
        app: &AppInfo,
        depots: Vec<DepotInfo>,
    ) -> Result<Vec<DepotInfo>, PrefillError> {
        self.record(app.id, "link");
        Ok(depots)
    }

    async fn build_queue(
        &self,
        app: &AppInfo,
        depots: &[DepotInfo],
        _endpoints: &[Endpoint],
    ) -> Result<Vec<QueuedRequest>, PrefillError> {
        self.record(app.id, "build_queue");
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(fail) = self.queue_failures.lock().get(&app.id) {
            return Err(fail(app.id));
        }
        let bytes = self.apps.lock().get(&app.id).map_or(0, |(_, bytes)| *bytes);
        Ok(match depots.first() {
            Some(depot) if bytes > 0 => vec![QueuedRequest {
                depot_id: depot.id,
                chunk_id: format!("{}-0", depot.id.get()),
                compressed_length: bytes,
            }],
            _ => Vec::new(),
        })
    }
}

// ========================================
// Transfer / endpoints
// ========================================

#[derive(Default)]
pub struct FakeExecutor {
    downloads: Mutex<Vec<AppId>>,
    failures: Mutex<HashMap<AppId, Failure>>,
}

impl FakeExecutor {
    /// Apps whose download completed, in order.
    pub fn downloads(&self) -> Vec<AppId> {
        self.downloads.lock().clone()
    }
}

#[async_trait]
impl DownloadExecutor for FakeExecutor {
    async fn download(
        &self,
        app: &AppInfo,
        requests: &[QueuedRequest],
    ) -> Result<TransferReport, PrefillError> {
        if let Some(fail) = self.failures.lock().get(&app.id) {
            return Err(fail(app.id));
        }
        self.downloads.lock().push(app.id);
        Ok(TransferReport {
            bytes_transferred: queued_bytes(requests),
        })
    }
}

pub struct StaticDiscovery;

#[async_trait]
impl EndpointDiscovery for StaticDiscovery {
    async fn discover(&self) -> Result<Vec<Endpoint>, PrefillError> {
        Ok(vec![Endpoint {
            host: "lancache.local".to_string(),
            port: 80,
        }])
    }
}

/// Wraps the in-memory store and rejects any batch touching a listed depot,
/// leaving the inner store unchanged.
pub struct RejectingSuccessStore {
    inner: Arc<InMemorySuccessStore>,
    rejected: Mutex<HashSet<DepotId>>,
}

impl RejectingSuccessStore {
    pub fn new(inner: Arc<InMemorySuccessStore>) -> Self {
        Self {
            inner,
            rejected: Mutex::new(HashSet::new()),
        }
    }

    pub fn reject(&self, depot: DepotId) {
        self.rejected.lock().insert(depot);
    }
}

#[async_trait]
impl SuccessStateStore for RejectingSuccessStore {
    async fn get(&self, depot_id: DepotId) -> Result<Option<u64>, PrefillError> {
        self.inner.get(depot_id).await
    }

    async fn put_all(&self, entries: &[(DepotId, u64)]) -> Result<(), PrefillError> {
        let blocked = {
            let rejected = self.rejected.lock();
            entries.iter().any(|(depot, _)| rejected.contains(depot))
        };
        if blocked {
            return Err(PrefillError::io(
                "success_state.json",
                std::io::Error::other("no space left on device"),
            ));
        }
        self.inner.put_all(entries).await
    }
}

// ========================================
// World
// ========================================

pub struct World {
    pub catalog: Arc<FakeCatalog>,
    pub executor: Arc<FakeExecutor>,
    pub success: Arc<InMemorySuccessStore>,
    success_port: Arc<RejectingSuccessStore>,
    endpoints: Arc<CachedEndpointPool>,
    owned_apps: Vec<AppId>,
    owned_depots: Vec<DepotId>,
    fail_licenses: bool,
    concurrency: usize,
}

impl World {
    pub fn new() -> Self {
        let success = Arc::new(InMemorySuccessStore::new());
        Self {
            catalog: Arc::new(FakeCatalog::default()),
            executor: Arc::new(FakeExecutor::default()),
            success: success.clone(),
            success_port: Arc::new(RejectingSuccessStore::new(success)),
            endpoints: Arc::new(CachedEndpointPool::new(Arc::new(StaticDiscovery))),
            owned_apps: Vec::new(),
            owned_depots: Vec::new(),
            fail_licenses: false,
            concurrency: 5,
        }
    }

    /// `queue_bytes` is the size of the single chunk queued for the app's
    /// first depot; zero means an empty queue.
    pub fn with_app(self, app: AppInfo, queue_bytes: u64) -> Self {
        self.catalog.apps.lock().insert(app.id, (app, queue_bytes));
        self
    }

    pub fn owning(mut self, apps: &[u32], depots: &[u32]) -> Self {
        self.owned_apps = apps.iter().copied().map(AppId::new).collect();
        self.owned_depots = depots.iter().copied().map(DepotId::new).collect();
        self
    }

    pub fn with_failing_licenses(mut self) -> Self {
        self.fail_licenses = true;
        self
    }

    pub fn failing_queue(self, app: u32, fail: Failure) -> Self {
        self.catalog.queue_failures.lock().insert(AppId::new(app), fail);
        self
    }

    pub fn failing_download(self, app: u32, fail: Failure) -> Self {
        self.executor.failures.lock().insert(AppId::new(app), fail);
        self
    }

    /// Success-state writes covering `depot` fail with `Io`.
    pub fn failing_success_write(self, depot: u32) -> Self {
        self.success_port.reject(DepotId::new(depot));
        self
    }

    pub fn with_queue_delay_ms(self, ms: u64) -> Self {
        *self.catalog.delay.lock() = Duration::from_millis(ms);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    fn package(&self) -> PackageProductInfo {
        PackageProductInfo {
            id: PackageId::new(1),
            app_ids: self.owned_apps.clone(),
            depot_ids: self.owned_depots.clone(),
            is_free_weekend: false,
            expires_at: None,
            expired: false,
        }
    }

    /// Fully wired builder with all state under `state_dir`.
    pub fn builder(&self, state_dir: &Path) -> PrefillBuilder {
        let mut config = PrefillConfig::with_state_dir(state_dir);
        config.benchmark.concurrency = self.concurrency;
        config.benchmark.output_path = state_dir.join("benchmark.json");

        let mut session = FakeSession::new("alice")
            .with_owned(self.owned_apps.clone())
            .with_licenses(vec![License {
                package_id: PackageId::new(1),
                access_token: 0,
                expired: false,
            }]);
        if self.fail_licenses {
            session = session.failing_licenses();
        }

        PrefillBuilder::new(config)
            .session(Arc::new(session))
            .product_info(Arc::new(FakeProductInfo::new([self.package()])))
            .metadata(self.catalog.clone())
            .depots(self.catalog.clone())
            .endpoints(self.endpoints.clone())
            .executor(self.executor.clone())
            .success_state(self.success_port.clone())
    }

    /// Pipeline over a snapshot granting exactly the given ids.
    pub fn pipeline_owning(&self, apps: &[u32], depots: &[u32]) -> AppPipeline {
        let package = Package {
            id: PackageId::new(1),
            app_ids: apps.iter().copied().map(AppId::new).collect(),
            depot_ids: depots.iter().copied().map(DepotId::new).collect(),
            is_free_weekend: false,
            free_weekend_expired: false,
        };
        AppPipeline {
            config: Arc::new(PrefillConfig::default()),
            entitlements: Arc::new(EntitlementSnapshot::from_packages(1, [package])),
            metadata: self.catalog.clone(),
            depots: self.catalog.clone(),
            endpoints: self.endpoints.clone(),
            executor: self.executor.clone(),
            success: self.success_port.clone(),
        }
    }
}
