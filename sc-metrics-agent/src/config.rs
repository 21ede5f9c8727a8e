//! Configuration loading and validation
//!
//! Handles:
//! - Tenable.sc URL, admin credentials and per-organization credentials
//! - DogStatsD address and global tags
//! - Collection interval
//! - Logging level and format

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "./config.yml";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_STATSD_ADDRESS: &str = "localhost:8125";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default)]
    pub datadog: DatadogConfig,
    #[serde(default = "default_interval", with = "humantime_duration")]
    pub interval: Duration,
    pub tenablesc: TenableScConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatadogConfig {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TenableScConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub admin_credentials: Credentials,
    /// Organization name -> credentials of an organization user
    #[serde(default)]
    pub org_credentials: BTreeMap<String, Credentials>,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub pretty: bool,
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

// Never print secrets
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    fn is_complete(&self) -> bool {
        !self.access_key.trim().is_empty() && !self.secret_key.trim().is_empty()
    }
}

impl TenableScConfig {
    /// Configured organization names, sorted
    pub fn org_names(&self) -> Vec<String> {
        self.org_credentials.keys().cloned().collect()
    }
}

impl AgentConfig {
    /// Read and validate the YAML config at `path`
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::parse(&content)
    }

    /// Parse, apply defaults and validate
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: AgentConfig = serde_yaml::from_str(content)?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        if self.interval.is_zero() {
            self.interval = DEFAULT_INTERVAL;
        }
        if self.datadog.address.trim().is_empty() {
            self.datadog.address = DEFAULT_STATSD_ADDRESS.to_string();
        }
        if self.logging.level.trim().is_empty() {
            self.logging.level = DEFAULT_LOG_LEVEL.to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sc = &self.tenablesc;
        if sc.url.trim().is_empty() {
            return Err(ConfigError::Invalid("no tenable URL set".into()));
        }
        reqwest::Url::parse(&sc.url)
            .map_err(|e| ConfigError::Invalid(format!("tenable URL {:?}: {e}", sc.url)))?;

        if !sc.admin_credentials.is_complete() {
            return Err(ConfigError::Invalid("admin credentials require accessKey and secretKey".into()));
        }
        for (org, creds) in &sc.org_credentials {
            if org.trim().is_empty() {
                return Err(ConfigError::Invalid("organization name must not be empty".into()));
            }
            if !creds.is_complete() {
                return Err(ConfigError::Invalid(format!(
                    "credentials for organization {org} require accessKey and secretKey"
                )));
            }
        }

        if self.logging.level != "off" && tracing::Level::from_str(&self.logging.level).is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level {:?}",
                self.logging.level
            )));
        }

        Ok(())
    }
}

/// `interval: 5m` style durations
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}
