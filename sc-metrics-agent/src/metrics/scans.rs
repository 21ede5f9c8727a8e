//! Scan freshness and duration
//!
//! Both analyzers share the same gate (`should_have_results`) and the same
//! join (`newest_result`): a scan is judged only by its most recent result
//! that has finished running and finished importing.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

use super::{MetricSnapshot, ORG_TAG, SCAN_NAME_TAG};
use crate::entities::{Scan, ScanResult};
use crate::error::MetricsError;
use crate::metrics::MetricKey;

/// Reported age when a scan's last completion can't be determined (30 days)
pub const CEILING_MINUTES: i64 = 30 * 24 * 60;

/// Scans younger than this are not expected to have results yet
pub const NEW_SCAN_WINDOW_HOURS: i64 = 48;

/// Schedule type of recurring calendar scans
pub const RECURRING_SCHEDULE_TYPE: &str = "ical";

pub const IMPORT_FINISHED: &str = "Finished";

/// `finishTime` of a result that is still running
pub const UNFINISHED_SENTINEL: &str = "-1";

pub fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let secs = s.trim().parse::<i64>().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

fn is_new(created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    created > now - Duration::hours(NEW_SCAN_WINDOW_HOURS)
}

/// Excludes scans created in the last 48h and scans that are on-demand or
/// have no repeat rule. An unparsable creation time does not exclude a scan.
pub fn should_have_results(scan: &Scan, now: DateTime<Utc>) -> bool {
    if parse_epoch(&scan.created_time).is_some_and(|created| is_new(created, now)) {
        return false;
    }
    scan.schedule.schedule_type == RECURRING_SCHEDULE_TYPE && !scan.schedule.repeat_rule.is_empty()
}

/// Most recently finished, fully imported result for `scan`
pub fn newest_result<'a>(scan: &Scan, results: &'a [ScanResult]) -> Option<&'a ScanResult> {
    let mut newest: Option<(&ScanResult, Option<i64>)> = None;

    for result in results {
        if result.name != scan.name {
            continue;
        }
        if result.finish_time.trim() == UNFINISHED_SENTINEL {
            continue;
        }
        if result.import_status != IMPORT_FINISHED {
            continue;
        }

        // unparsable finish times rank below every parsable one
        let finished = result.finish_time.trim().parse::<i64>().ok();
        match newest {
            Some((_, best)) if finished <= best => {}
            _ => newest = Some((result, finished)),
        }
    }

    newest.map(|(result, _)| result)
}

/// Whole minutes between the result's finish time and `now`, never negative
pub fn minutes_since(finish_time: &str, now: DateTime<Utc>) -> i64 {
    match parse_epoch(finish_time) {
        Some(finished) => (now - finished).num_minutes().max(0),
        None => CEILING_MINUTES,
    }
}

/// Scan name -> minutes since its last completed result
pub fn scan_ages(scans: &[Scan], results: &[ScanResult], now: DateTime<Utc>) -> BTreeMap<String, i64> {
    let mut ages = BTreeMap::new();

    for scan in scans {
        if !should_have_results(scan, now) {
            debug!(scan = %scan.name, "scan not expected to have results");
            continue;
        }

        match newest_result(scan, results) {
            Some(result) => {
                let age = minutes_since(&result.finish_time, now);
                debug!(scan = %scan.name, finish_time = %result.finish_time, age_minutes = age, "got scan age");
                ages.insert(scan.name.clone(), age);
            }
            None => {
                if parse_epoch(&scan.created_time).is_some_and(|created| is_new(created, now)) {
                    debug!(scan = %scan.name, "scan is new, skipping report");
                    continue;
                }
                debug!(scan = %scan.name, "scan had no recent results, reporting ceiling age");
                ages.insert(scan.name.clone(), CEILING_MINUTES);
            }
        }
    }

    ages
}

/// Scan name -> duration in seconds of its last completed result.
/// Scans without a qualifying result are omitted.
pub fn scan_durations(
    scans: &[Scan],
    results: &[ScanResult],
    now: DateTime<Utc>,
) -> Result<BTreeMap<String, i64>, MetricsError> {
    let mut durations = BTreeMap::new();

    for scan in scans {
        if !should_have_results(scan, now) {
            continue;
        }

        let Some(result) = newest_result(scan, results) else {
            debug!(scan = %scan.name, "scan had no recent results");
            continue;
        };

        let duration = result
            .scan_duration
            .trim()
            .parse::<i64>()
            .map_err(|source| MetricsError::Parse {
                field: "scanDuration",
                entity: format!("scan result {} of scan {}", result.id, scan.name),
                value: result.scan_duration.clone(),
                source,
            })?;
        debug!(scan = %scan.name, duration_seconds = duration, "got scan duration");
        durations.insert(scan.name.clone(), duration);
    }

    Ok(durations)
}

/// Records `values` keyed by scan name under `metric`, tagged with the organization
pub fn record_per_scan(
    snapshot: &mut MetricSnapshot,
    metric: &str,
    org: &str,
    values: &BTreeMap<String, i64>,
) {
    for (scan_name, value) in values {
        let key = MetricKey::new(metric)
            .tag(ORG_TAG, org)
            .tag(SCAN_NAME_TAG, scan_name);
        snapshot.insert(&key, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Schedule;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap()
    }

    fn ago(d: Duration) -> String {
        (now() - d).timestamp().to_string()
    }

    fn scan(name: &str, created: &str) -> Scan {
        Scan {
            id: String::new(),
            name: name.into(),
            created_time: created.into(),
            schedule: Schedule {
                schedule_type: "ical".into(),
                repeat_rule: "FREQ=DAILY;INTERVAL=1".into(),
            },
        }
    }

    fn result(name: &str, finish: &str, status: &str, duration: &str) -> ScanResult {
        ScanResult {
            id: String::new(),
            name: name.into(),
            finish_time: finish.into(),
            import_status: status.into(),
            scan_duration: duration.into(),
        }
    }

    #[test]
    fn test_matcher_skips_running_and_importing() {
        let s = scan("weekly", &ago(Duration::days(90)));
        let results = vec![
            result("weekly", "-1", "Finished", "1"),
            result("weekly", "100", "Importing", "2"),
            result("weekly", "200", "Finished", "3"),
            result("other", "300", "Finished", "4"),
        ];
        let chosen = newest_result(&s, &results).unwrap();
        assert_eq!(chosen.finish_time, "200");
    }

    #[test]
    fn test_matcher_no_match() {
        let s = scan("weekly", "0");
        let results = vec![result("weekly", "-1", "Finished", "1")];
        assert!(newest_result(&s, &results).is_none());
        assert!(newest_result(&s, &[]).is_none());
    }

    #[test]
    fn test_gate() {
        let old = scan("old", &ago(Duration::days(90)));
        assert!(should_have_results(&old, now()));

        let new = scan("new", &ago(Duration::hours(2)));
        assert!(!should_have_results(&new, now()));

        let unparsable = scan("bad", "not-a-time");
        assert!(should_have_results(&unparsable, now()));

        let mut on_demand = old.clone();
        on_demand.schedule.schedule_type = "now".into();
        assert!(!should_have_results(&on_demand, now()));

        let mut no_rule = old.clone();
        no_rule.schedule.repeat_rule.clear();
        assert!(!should_have_results(&no_rule, now()));
    }

    #[test]
    fn test_age_from_newest_result() {
        let scans = vec![scan("daily", &ago(Duration::days(10)))];
        let results = vec![
            result("daily", &ago(Duration::minutes(90) + Duration::seconds(30)), "Finished", "60"),
            result("daily", &ago(Duration::days(1)), "Finished", "60"),
        ];
        let ages = scan_ages(&scans, &results, now());
        assert_eq!(ages["daily"], 90);
    }

    #[test]
    fn test_ceiling_for_old_scan_without_results() {
        let scans = vec![scan("stale", &ago(Duration::days(90)))];
        let ages = scan_ages(&scans, &[], now());
        assert_eq!(ages["stale"], CEILING_MINUTES);
        assert_eq!(CEILING_MINUTES, 43_200);
    }

    #[test]
    fn test_ceiling_for_unparsable_creation_time() {
        let scans = vec![scan("mystery", "")];
        let ages = scan_ages(&scans, &[], now());
        assert_eq!(ages["mystery"], CEILING_MINUTES);
    }

    #[test]
    fn test_new_scan_suppressed() {
        let scans = vec![scan("fresh", &ago(Duration::hours(2)))];
        assert!(scan_ages(&scans, &[], now()).is_empty());
        assert!(scan_durations(&scans, &[], now()).unwrap().is_empty());
    }

    #[test]
    fn test_durations() {
        let scans = vec![
            scan("a", &ago(Duration::days(5))),
            scan("b", &ago(Duration::days(5))),
        ];
        let results = vec![
            result("a", &ago(Duration::hours(3)), "Finished", "3600"),
            result("a", &ago(Duration::hours(1)), "Finished", "1800"),
        ];
        let durations = scan_durations(&scans, &results, now()).unwrap();
        assert_eq!(durations["a"], 1800);
        assert!(!durations.contains_key("b"));
    }

    #[test]
    fn test_unparsable_duration_is_error() {
        let scans = vec![scan("a", &ago(Duration::days(5)))];
        let results = vec![result("a", &ago(Duration::hours(1)), "Finished", "n/a")];
        let err = scan_durations(&scans, &results, now()).unwrap_err();
        assert!(matches!(err, MetricsError::Parse { field: "scanDuration", .. }));
    }

    #[test]
    fn test_record_per_scan_tags() {
        let mut snapshot = MetricSnapshot::default();
        let values = BTreeMap::from([("weekly".to_string(), 42)]);
        record_per_scan(&mut snapshot, "minutesSinceLastScan", "Acme", &values);
        assert_eq!(snapshot.get("minutesSinceLastScan[org:Acme,scanName:weekly]"), Some(42));
    }
}
