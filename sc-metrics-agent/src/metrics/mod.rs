//! Tenable.sc metric aggregation
//!
//! One call to [`MetricSnapshot::collect`] runs a full cycle:
//! - Scanner health, globally and per scan zone (admin client)
//! - Job queue length, overdue jobs and per type backlog (admin client)
//! - Minutes since last completed scan and last scan duration (per organization)
//! - Asset IP counts (per organization)
//!
//! Every cycle builds a fresh snapshot. Any failure aborts the cycle and no
//! partial snapshot is returned.

pub mod assets;
pub mod jobs;
pub mod scanners;
pub mod scans;
pub mod tags;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::MetricsError;
use crate::source::{ClientProvider, EntitySource};

pub use tags::{tagged_metric_name, MetricKey, NONE_TAG_VALUE};

pub const HEALTHY_SCANNER_COUNT: &str = "healthyScannerCount";
pub const UNHEALTHY_SCANNER_COUNT: &str = "unhealthyScannerCount";
pub const TOTAL_SCANNER_COUNT: &str = "totalScannerCount";
pub const JOB_QUEUE_LENGTH: &str = "jobQueueLength";
pub const JOBS_NOT_STARTED: &str = "jobsNotStarted";
pub const MINUTES_SINCE_LAST_SCAN: &str = "minutesSinceLastScan";
pub const SCAN_DURATION_SECONDS: &str = "scanDurationSeconds";
pub const IP_COUNT: &str = "ipCount";

/// Reserved for the scheduler; never produced by aggregation
pub const FAILED_UPDATE: &str = "failedUpdate";

pub const SCAN_ZONE_TAG: &str = "scanZone";
pub const JOB_TYPE_TAG: &str = "jobType";
pub const ORG_TAG: &str = "org";
pub const SCAN_NAME_TAG: &str = "scanName";
pub const ASSET_NAME_TAG: &str = "assetName";

/// Encoded metric key -> value for one aggregation cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSnapshot {
    values: BTreeMap<String, i64>,
}

impl MetricSnapshot {
    pub fn insert(&mut self, key: &MetricKey, value: i64) {
        self.values.insert(key.encode(), value);
    }

    pub fn get(&self, encoded_key: &str) -> Option<i64> {
        self.values.get(encoded_key).copied()
    }

    /// Entries in encoded key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Runs one complete aggregation cycle against `provider`
    pub async fn collect<P>(provider: &P, now: DateTime<Utc>) -> Result<Self, MetricsError>
    where
        P: ClientProvider + ?Sized,
    {
        debug!("Collecting Tenable.sc metrics...");
        let mut snapshot = MetricSnapshot::default();

        let admin = provider.admin_client().await?;
        scanners::collect_scanner_status(&admin)
            .await?
            .record_into(&mut snapshot);
        jobs::collect_job_queue(&admin, now)
            .await?
            .record_into(&mut snapshot);

        let mut org_names = provider.org_names();
        org_names.sort();
        for org_name in &org_names {
            let client = provider.org_client(org_name).await?;
            snapshot.collect_org(&client, org_name, now).await?;
        }

        info!(metrics = snapshot.len(), organizations = org_names.len(), "metrics collected");
        Ok(snapshot)
    }

    async fn collect_org<S>(
        &mut self,
        client: &S,
        configured_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MetricsError>
    where
        S: EntitySource + ?Sized,
    {
        let user = client
            .current_user()
            .await
            .map_err(MetricsError::source("get current user"))?;
        let org = user.org_display_name().to_string();
        debug!(configured = configured_name, org = %org, "collecting organization metrics");

        let scans = client
            .scans()
            .await
            .map_err(MetricsError::source("list scans"))?;
        let results = client
            .scan_results()
            .await
            .map_err(MetricsError::source("list scan results"))?;

        let ages = scans::scan_ages(&scans, &results, now);
        scans::record_per_scan(self, MINUTES_SINCE_LAST_SCAN, &org, &ages);

        let durations = scans::scan_durations(&scans, &results, now)?;
        scans::record_per_scan(self, SCAN_DURATION_SECONDS, &org, &durations);

        let assets = client
            .assets()
            .await
            .map_err(MetricsError::source("list assets"))?;
        let ip_counts = assets::asset_ip_counts(&assets)?;
        assets::record_ip_counts(self, &org, &ip_counts);

        Ok(())
    }
}

impl<'a> IntoIterator for &'a MetricSnapshot {
    type Item = (&'a String, &'a i64);
    type IntoIter = std::collections::btree_map::Iter<'a, String, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_insert_and_order() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.insert(&MetricKey::new("b"), 2);
        snapshot.insert(&MetricKey::new("a").tag("k", "v"), 1);
        snapshot.insert(&MetricKey::new("b"), 3);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("b"), Some(3));
        let keys: Vec<_> = snapshot.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a[k:v]", "b"]);
    }
}
