//! Entity views returned by the Tenable.sc API
//!
//! The API carries identifiers, timestamps and counts as decimal strings.
//! They are kept as text here; the metrics engine decides which fields are
//! parsed strictly and which are skipped on failure.

use serde::{Deserialize, Deserializer, Serialize};

/// Scan definition (`/scan`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Epoch string
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_time: String,
    #[serde(default)]
    pub schedule: Schedule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(rename = "type", default)]
    pub schedule_type: String,
    #[serde(default)]
    pub repeat_rule: String,
}

/// One execution record of a scan (`/scanResult`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    /// Join key against `Scan::name`
    #[serde(default)]
    pub name: String,
    /// Epoch string, `-1` while the scan is still running
    #[serde(default, deserialize_with = "lenient_string")]
    pub finish_time: String,
    #[serde(default)]
    pub import_status: String,
    /// Seconds
    #[serde(default, deserialize_with = "lenient_string")]
    pub scan_duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scanner {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanZone {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scanners: Vec<ScannerRef>,
}

/// Scanner membership entry inside a scan zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannerRef {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Queued job (`/job`, admin only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub job_type: String,
    /// Epoch string, may be empty or `0`
    #[serde(default, deserialize_with = "lenient_string")]
    pub targeted_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `-1` while the asset is being recalculated
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip_count: String,
}

/// Authenticated user (`/currentUser`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub organization: Option<OrganizationRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRef {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl CurrentUser {
    /// Display name of the user's organization, empty for the admin user
    pub fn org_display_name(&self) -> &str {
        match (&self.org_name, &self.organization) {
            (Some(name), _) if !name.is_empty() => name,
            (_, Some(org)) => &org.name,
            _ => "",
        }
    }
}

/// Accepts a JSON string, number, bool or null and keeps it as text
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_decoding() {
        let scan: Scan = serde_json::from_str(
            r#"{"id":"12","name":"weekly","createdTime":"1600000000",
                "schedule":{"type":"ical","repeatRule":"FREQ=WEEKLY;INTERVAL=1"}}"#,
        )
        .unwrap();
        assert_eq!(scan.id, "12");
        assert_eq!(scan.created_time, "1600000000");
        assert_eq!(scan.schedule.schedule_type, "ical");
        assert_eq!(scan.schedule.repeat_rule, "FREQ=WEEKLY;INTERVAL=1");
    }

    #[test]
    fn test_numbers_kept_as_text() {
        let asset: Asset = serde_json::from_str(r#"{"id":3,"name":"dmz","ipCount":-1}"#).unwrap();
        assert_eq!(asset.id, "3");
        assert_eq!(asset.ip_count, "-1");

        let job: Job = serde_json::from_str(r#"{"type":"scan","targetedTime":null}"#).unwrap();
        assert_eq!(job.targeted_time, "");
    }

    #[test]
    fn test_org_display_name() {
        let user: CurrentUser =
            serde_json::from_str(r#"{"username":"a","organization":{"id":"1","name":"Acme"}}"#)
                .unwrap();
        assert_eq!(user.org_display_name(), "Acme");

        let user: CurrentUser = serde_json::from_str(r#"{"orgName":"Beta"}"#).unwrap();
        assert_eq!(user.org_display_name(), "Beta");

        assert_eq!(CurrentUser::default().org_display_name(), "");
    }
}
