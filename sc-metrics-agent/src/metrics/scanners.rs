//! Scanner health rolled up globally and per scan zone

use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

use tracing::debug;

use super::{
    MetricSnapshot, HEALTHY_SCANNER_COUNT, SCAN_ZONE_TAG, TOTAL_SCANNER_COUNT,
    UNHEALTHY_SCANNER_COUNT,
};
use crate::entities::{ScanZone, Scanner};
use crate::error::MetricsError;
use crate::metrics::MetricKey;
use crate::source::EntitySource;

/// Zone name for scanners no scan zone lists
pub const NO_ASSOCIATED_ZONE: &str = "no-associated-zone";

/// Status code reported by a working scanner
pub const HEALTHY_STATUS: &str = "1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthCount {
    pub total: i64,
    pub healthy: i64,
    pub unhealthy: i64,
}

impl HealthCount {
    fn record(&mut self, healthy: bool) {
        self.total += 1;
        if healthy {
            self.healthy += 1;
        } else {
            self.unhealthy += 1;
        }
    }
}

impl AddAssign for HealthCount {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.healthy += other.healthy;
        self.unhealthy += other.unhealthy;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannerStatus {
    pub global: HealthCount,
    pub by_zone: BTreeMap<String, HealthCount>,
}

pub fn scanner_is_healthy(scanner: &Scanner) -> bool {
    scanner.status == HEALTHY_STATUS
}

/// Scanner id -> owning zone name. A scanner listed by several zones keeps the last one.
fn zone_by_scanner(zones: &[ScanZone]) -> HashMap<&str, &str> {
    zones
        .iter()
        .flat_map(|zone| {
            zone.scanners
                .iter()
                .map(move |scanner| (scanner.id.as_str(), zone.name.as_str()))
        })
        .collect()
}

pub fn scanner_status(zones: &[ScanZone], scanners: &[Scanner]) -> ScannerStatus {
    let zone_lookup = zone_by_scanner(zones);
    debug!(zones = zones.len(), mapped_scanners = zone_lookup.len(), "built scan zone map");

    let mut status = ScannerStatus::default();
    for scanner in scanners {
        let zone = zone_lookup
            .get(scanner.id.as_str())
            .copied()
            .filter(|name| !name.is_empty())
            .unwrap_or(NO_ASSOCIATED_ZONE);
        let healthy = scanner_is_healthy(scanner);
        debug!(zone, scanner = %scanner.name, healthy, "checking scanner");

        status.global.record(healthy);
        status.by_zone.entry(zone.to_string()).or_default().record(healthy);
    }

    status
}

pub async fn collect_scanner_status<S>(source: &S) -> Result<ScannerStatus, MetricsError>
where
    S: EntitySource + ?Sized,
{
    let zones = source
        .scan_zones()
        .await
        .map_err(MetricsError::source("list scan zones"))?;
    let scanners = source
        .scanners()
        .await
        .map_err(MetricsError::source("list scanners"))?;

    Ok(scanner_status(&zones, &scanners))
}

impl ScannerStatus {
    /// Global counts untagged, then one tagged triple per observed zone
    pub fn record_into(&self, snapshot: &mut MetricSnapshot) {
        record_counts(snapshot, self.global, None);
        for (zone, counts) in &self.by_zone {
            record_counts(snapshot, *counts, Some(zone));
        }
    }
}

fn record_counts(snapshot: &mut MetricSnapshot, counts: HealthCount, zone: Option<&str>) {
    let key = |name: &str| match zone {
        Some(zone) => MetricKey::new(name).tag(SCAN_ZONE_TAG, zone),
        None => MetricKey::new(name),
    };
    snapshot.insert(&key(HEALTHY_SCANNER_COUNT), counts.healthy);
    snapshot.insert(&key(UNHEALTHY_SCANNER_COUNT), counts.unhealthy);
    snapshot.insert(&key(TOTAL_SCANNER_COUNT), counts.total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ScannerRef;

    fn scanner(id: &str, status: &str) -> Scanner {
        Scanner {
            id: id.into(),
            name: format!("scanner-{id}"),
            status: status.into(),
        }
    }

    fn zone(name: &str, ids: &[&str]) -> ScanZone {
        ScanZone {
            id: String::new(),
            name: name.into(),
            scanners: ids
                .iter()
                .map(|id| ScannerRef { id: id.to_string(), name: String::new() })
                .collect(),
        }
    }

    #[test]
    fn test_health_classification() {
        assert!(scanner_is_healthy(&scanner("1", "1")));
        assert!(!scanner_is_healthy(&scanner("1", "0")));
        assert!(!scanner_is_healthy(&scanner("1", "16384")));
        assert!(!scanner_is_healthy(&scanner("1", "")));
    }

    #[test]
    fn test_zone_partition_sums_to_global() {
        let zones = vec![zone("east", &["1", "2"]), zone("west", &["3"])];
        let scanners = vec![
            scanner("1", "1"),
            scanner("2", "2"),
            scanner("3", "1"),
            scanner("4", "1"),
            scanner("5", "64"),
        ];

        let status = scanner_status(&zones, &scanners);
        assert_eq!(status.global, HealthCount { total: 5, healthy: 3, unhealthy: 2 });
        assert_eq!(status.by_zone["east"], HealthCount { total: 2, healthy: 1, unhealthy: 1 });
        assert_eq!(status.by_zone["west"], HealthCount { total: 1, healthy: 1, unhealthy: 0 });
        assert_eq!(
            status.by_zone[NO_ASSOCIATED_ZONE],
            HealthCount { total: 2, healthy: 1, unhealthy: 1 }
        );

        let mut sum = HealthCount::default();
        for counts in status.by_zone.values() {
            sum += *counts;
        }
        assert_eq!(sum, status.global);
    }

    #[test]
    fn test_empty_zone_not_reported() {
        let zones = vec![zone("empty", &[]), zone("used", &["1"])];
        let status = scanner_status(&zones, &[scanner("1", "1")]);
        assert!(!status.by_zone.contains_key("empty"));

        let mut snapshot = MetricSnapshot::default();
        status.record_into(&mut snapshot);
        assert_eq!(snapshot.get("healthyScannerCount"), Some(1));
        assert_eq!(snapshot.get("unhealthyScannerCount"), Some(0));
        assert_eq!(snapshot.get("totalScannerCount[scanZone:used]"), Some(1));
        assert_eq!(snapshot.get("totalScannerCount[scanZone:empty]"), None);
        assert_eq!(snapshot.len(), 6);
    }
}
