/*!
In-memory Entity Source for tests without a Tenable.sc instance

Serves fixed entity lists, records every call it receives, and can be told
to fail individual operations.
*/

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sc_metrics_agent::entities::{Asset, CurrentUser, Job, Scan, ScanResult, ScanZone, Scanner};
use sc_metrics_agent::error::{MetricsError, SourceError};
use sc_metrics_agent::source::{ClientProvider, EntitySource};

pub const OP_SCANS: &str = "scans";
pub const OP_SCAN_RESULTS: &str = "scan_results";
pub const OP_SCANNERS: &str = "scanners";
pub const OP_SCAN_ZONES: &str = "scan_zones";
pub const OP_JOBS: &str = "jobs";
pub const OP_ASSETS: &str = "assets";
pub const OP_CURRENT_USER: &str = "current_user";

#[derive(Debug, Clone, Default)]
struct EntityData {
    scans: Vec<Scan>,
    scan_results: Vec<ScanResult>,
    scanners: Vec<Scanner>,
    scan_zones: Vec<ScanZone>,
    jobs: Vec<Job>,
    assets: Vec<Asset>,
    current_user: CurrentUser,
}

/// Mock Entity Source; clones share data, call log and failures
#[derive(Debug, Clone, Default)]
pub struct MockEntitySource {
    data: Arc<Mutex<EntityData>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
    failures: Arc<Mutex<HashSet<&'static str>>>,
    /// Latency added to every call
    delay: Duration,
}

impl MockEntitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scans(self, scans: Vec<Scan>) -> Self {
        self.data.lock().unwrap().scans = scans;
        self
    }

    pub fn with_scan_results(self, results: Vec<ScanResult>) -> Self {
        self.data.lock().unwrap().scan_results = results;
        self
    }

    pub fn with_scanners(self, scanners: Vec<Scanner>) -> Self {
        self.data.lock().unwrap().scanners = scanners;
        self
    }

    pub fn with_scan_zones(self, zones: Vec<ScanZone>) -> Self {
        self.data.lock().unwrap().scan_zones = zones;
        self
    }

    pub fn with_jobs(self, jobs: Vec<Job>) -> Self {
        self.data.lock().unwrap().jobs = jobs;
        self
    }

    pub fn with_assets(self, assets: Vec<Asset>) -> Self {
        self.data.lock().unwrap().assets = assets;
        self
    }

    pub fn with_current_user(self, user: CurrentUser) -> Self {
        self.data.lock().unwrap().current_user = user;
        self
    }

    /// Makes `operation` (one of the `OP_*` names) fail until cleared
    pub fn fail_on(self, operation: &'static str) -> Self {
        self.failures.lock().unwrap().insert(operation);
        self
    }

    /// Simulates a slow Tenable.sc instance
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Operations called so far, in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|op| **op == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    async fn serve<T>(
        &self,
        operation: &'static str,
        select: impl FnOnce(&EntityData) -> T,
    ) -> Result<T, SourceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.lock().unwrap().push(operation);
        if self.failures.lock().unwrap().contains(&operation) {
            log::info!("[MOCK] injected failure for {}", operation);
            return Err(SourceError::Other(format!("injected failure: {operation}")));
        }
        let data = self.data.lock().unwrap();
        Ok(select(&*data))
    }
}

#[async_trait]
impl EntitySource for MockEntitySource {
    async fn scans(&self) -> Result<Vec<Scan>, SourceError> {
        self.serve(OP_SCANS, |d| d.scans.clone()).await
    }

    async fn scan_results(&self) -> Result<Vec<ScanResult>, SourceError> {
        self.serve(OP_SCAN_RESULTS, |d| d.scan_results.clone()).await
    }

    async fn scanners(&self) -> Result<Vec<Scanner>, SourceError> {
        self.serve(OP_SCANNERS, |d| d.scanners.clone()).await
    }

    async fn scan_zones(&self) -> Result<Vec<ScanZone>, SourceError> {
        self.serve(OP_SCAN_ZONES, |d| d.scan_zones.clone()).await
    }

    async fn jobs(&self) -> Result<Vec<Job>, SourceError> {
        self.serve(OP_JOBS, |d| d.jobs.clone()).await
    }

    async fn assets(&self) -> Result<Vec<Asset>, SourceError> {
        self.serve(OP_ASSETS, |d| d.assets.clone()).await
    }

    async fn current_user(&self) -> Result<CurrentUser, SourceError> {
        self.serve(OP_CURRENT_USER, |d| d.current_user.clone()).await
    }
}

/// Client provider backed by mock sources
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    admin: MockEntitySource,
    orgs: BTreeMap<String, MockEntitySource>,
    /// Listed by `org_names` but without a client
    unreachable_orgs: Vec<String>,
}

impl MockProvider {
    pub fn new(admin: MockEntitySource) -> Self {
        Self {
            admin,
            ..Self::default()
        }
    }

    pub fn with_org(mut self, name: impl Into<String>, source: MockEntitySource) -> Self {
        self.orgs.insert(name.into(), source);
        self
    }

    pub fn with_unreachable_org(mut self, name: impl Into<String>) -> Self {
        self.unreachable_orgs.push(name.into());
        self
    }

    pub fn admin(&self) -> &MockEntitySource {
        &self.admin
    }

    pub fn org(&self, name: &str) -> Option<&MockEntitySource> {
        self.orgs.get(name)
    }
}

#[async_trait]
impl ClientProvider for MockProvider {
    type Client = MockEntitySource;

    async fn admin_client(&self) -> Result<MockEntitySource, MetricsError> {
        Ok(self.admin.clone())
    }

    fn org_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .orgs
            .keys()
            .chain(self.unreachable_orgs.iter())
            .cloned()
            .collect();
        names.sort();
        names
    }

    async fn org_client(&self, org_name: &str) -> Result<MockEntitySource, MetricsError> {
        self.orgs
            .get(org_name)
            .cloned()
            .ok_or_else(|| MetricsError::UnknownOrganization(org_name.to_string()))
    }
}
