//! Entity Source contract
//!
//! The metrics engine only talks to Tenable.sc through these traits, so the
//! HTTP client and the in-memory test sources are interchangeable.

use async_trait::async_trait;

use crate::entities::{Asset, CurrentUser, Job, Scan, ScanResult, ScanZone, Scanner};
use crate::error::{MetricsError, SourceError};

/// Typed entity lists for one client scope (admin or organization)
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn scans(&self) -> Result<Vec<Scan>, SourceError>;

    async fn scan_results(&self) -> Result<Vec<ScanResult>, SourceError>;

    async fn scanners(&self) -> Result<Vec<Scanner>, SourceError>;

    async fn scan_zones(&self) -> Result<Vec<ScanZone>, SourceError>;

    async fn jobs(&self) -> Result<Vec<Job>, SourceError>;

    async fn assets(&self) -> Result<Vec<Asset>, SourceError>;

    async fn current_user(&self) -> Result<CurrentUser, SourceError>;
}

/// Hands out the administrative client and one client per configured organization
#[async_trait]
pub trait ClientProvider: Send + Sync {
    type Client: EntitySource;

    async fn admin_client(&self) -> Result<Self::Client, MetricsError>;

    /// Configured organization names, sorted
    fn org_names(&self) -> Vec<String>;

    /// Fails with `MetricsError::UnknownOrganization` for unconfigured names
    async fn org_client(&self, org_name: &str) -> Result<Self::Client, MetricsError>;
}
