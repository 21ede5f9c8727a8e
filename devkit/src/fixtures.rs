/*!
Entity builders for Tenable.sc test data

Timestamps are given relative to a caller supplied `now` and rendered the
way the API sends them: epoch seconds as decimal strings.
*/

use chrono::{DateTime, Duration, TimeZone, Utc};

use sc_metrics_agent::entities::{
    Asset, CurrentUser, Job, OrganizationRef, Scan, ScanResult, ScanZone, Scanner, ScannerRef,
    Schedule,
};

/// Stable reference time used by the harness
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

pub fn epoch(at: DateTime<Utc>) -> String {
    at.timestamp().to_string()
}

pub fn scanner(id: &str, name: &str, healthy: bool) -> Scanner {
    Scanner {
        id: id.into(),
        name: name.into(),
        status: if healthy { "1" } else { "16384" }.into(),
    }
}

pub fn zone(id: &str, name: &str, scanner_ids: &[&str]) -> ScanZone {
    ScanZone {
        id: id.into(),
        name: name.into(),
        scanners: scanner_ids
            .iter()
            .map(|sid| ScannerRef {
                id: sid.to_string(),
                name: format!("scanner-{sid}"),
            })
            .collect(),
    }
}

/// Job targeted at `now - age`
pub fn job(id: &str, job_type: &str, now: DateTime<Utc>, age: Duration) -> Job {
    job_raw(id, job_type, &epoch(now - age))
}

pub fn job_raw(id: &str, job_type: &str, targeted_time: &str) -> Job {
    Job {
        id: id.into(),
        job_type: job_type.into(),
        targeted_time: targeted_time.into(),
    }
}

/// Recurring daily scan created `age` before `now`
pub fn recurring_scan(name: &str, now: DateTime<Utc>, age: Duration) -> Scan {
    Scan {
        id: format!("scan-{name}"),
        name: name.into(),
        created_time: epoch(now - age),
        schedule: Schedule {
            schedule_type: "ical".into(),
            repeat_rule: "FREQ=DAILY;INTERVAL=1".into(),
        },
    }
}

pub fn on_demand_scan(name: &str, now: DateTime<Utc>, age: Duration) -> Scan {
    Scan {
        schedule: Schedule {
            schedule_type: "template".into(),
            repeat_rule: String::new(),
        },
        ..recurring_scan(name, now, age)
    }
}

/// Imported result of `scan_name` that finished `age` before `now`
pub fn finished_result(scan_name: &str, now: DateTime<Utc>, age: Duration, duration_secs: i64) -> ScanResult {
    ScanResult {
        id: format!("result-{scan_name}-{}", age.num_seconds()),
        name: scan_name.into(),
        finish_time: epoch(now - age),
        import_status: "Finished".into(),
        scan_duration: duration_secs.to_string(),
    }
}

pub fn running_result(scan_name: &str) -> ScanResult {
    ScanResult {
        id: format!("result-{scan_name}-running"),
        name: scan_name.into(),
        finish_time: "-1".into(),
        import_status: "No Results".into(),
        scan_duration: "0".into(),
    }
}

pub fn asset(id: &str, name: &str, ip_count: i64) -> Asset {
    Asset {
        id: id.into(),
        name: name.into(),
        ip_count: ip_count.to_string(),
    }
}

pub fn org_user(username: &str, org_name: &str) -> CurrentUser {
    CurrentUser {
        username: username.into(),
        org_name: None,
        organization: Some(OrganizationRef {
            id: "1".into(),
            name: org_name.into(),
        }),
    }
}

pub fn admin_user() -> CurrentUser {
    CurrentUser {
        username: "admin".into(),
        ..CurrentUser::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_timestamps() {
        let now = fixed_now();
        let result = finished_result("daily", now, Duration::minutes(90), 600);
        assert_eq!(result.finish_time, (now.timestamp() - 90 * 60).to_string());
        assert_eq!(result.scan_duration, "600");

        let queued = job("7", "scan", now, Duration::minutes(10));
        assert_eq!(queued.targeted_time, (now.timestamp() - 600).to_string());
    }

    #[test]
    fn test_org_user_display_name() {
        assert_eq!(org_user("alice", "Acme").org_display_name(), "Acme");
        assert_eq!(admin_user().org_display_name(), "");
    }
}
