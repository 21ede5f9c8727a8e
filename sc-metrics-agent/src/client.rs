//! Tenable.sc REST client
//!
//! Implements [`EntitySource`] over HTTP:
//! - API key authentication (`x-apikey` header)
//! - Response envelope unwrapping (`response`, `error_code`, `error_msg`)
//! - `usable`/`manageable` list merging
//! - Field selection so only what the metrics need is transferred

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::config::{Credentials, TenableScConfig};
use crate::entities::{Asset, CurrentUser, Job, Scan, ScanResult, ScanZone, Scanner};
use crate::error::{MetricsError, SourceError};
use crate::source::{ClientProvider, EntitySource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SCAN_FIELDS: &str = "id,name,createdTime,schedule";
const SCAN_RESULT_FIELDS: &str = "id,name,finishTime,importStatus,scanDuration";
const SCANNER_FIELDS: &str = "id,name,status";
const ZONE_FIELDS: &str = "id,name,scanners";
const JOB_FIELDS: &str = "id,type,targetedTime";
const ASSET_FIELDS: &str = "id,name,ipCount";
const USER_FIELDS: &str = "id,username,orgName,organization";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: serde_json::Value,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

/// List endpoints answer either with a plain array or split by access level
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Plain(Vec<T>),
    Split {
        #[serde(default = "Vec::new")]
        usable: Vec<T>,
        #[serde(default = "Vec::new")]
        manageable: Vec<T>,
    },
}

impl<T> ListResponse<T> {
    /// Usable entries first, then manageable ones not already seen (by id)
    fn into_vec(self, id: impl Fn(&T) -> &str) -> Vec<T> {
        match self {
            ListResponse::Plain(items) => items,
            ListResponse::Split { usable, manageable } => {
                let seen: HashSet<String> = usable
                    .iter()
                    .map(|item| id(item).to_string())
                    .filter(|id| !id.is_empty())
                    .collect();
                let extra: Vec<T> = manageable
                    .into_iter()
                    .filter(|item| id(item).is_empty() || !seen.contains(id(item)))
                    .collect();
                usable.into_iter().chain(extra).collect()
            }
        }
    }
}

/// Client bound to one set of API keys
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base.as_str()).finish()
    }
}

impl ApiClient {
    pub fn new(url: &str, credentials: &Credentials) -> Result<Self, SourceError> {
        let base = rest_base(url)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("sc-metrics/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            api_key: format!(
                "accesskey={}; secretkey={};",
                credentials.access_key, credentials.secret_key
            ),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, SourceError> {
        self.base
            .join(endpoint)
            .map_err(|e| SourceError::InvalidUrl(format!("{endpoint}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, fields: &str) -> Result<T, SourceError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(endpoint, "requesting Tenable.sc resource");

        let response = self
            .http
            .get(url)
            .query(&[("fields", fields)])
            .header("x-apikey", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let envelope: Envelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(SourceError::Status {
                    endpoint: endpoint.to_string(),
                    status,
                })
            }
            Err(source) => {
                return Err(SourceError::Decode {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }
        };

        if envelope.error_code != 0 {
            return Err(SourceError::Api {
                endpoint: endpoint.to_string(),
                code: envelope.error_code,
                message: envelope.error_msg,
            });
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }

        serde_json::from_value(envelope.response).map_err(|source| SourceError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        fields: &str,
        id: impl Fn(&T) -> &str,
    ) -> Result<Vec<T>, SourceError> {
        let listed: ListResponse<T> = self.get(endpoint, fields).await?;
        Ok(listed.into_vec(id))
    }
}

/// `https://host[/prefix]` -> `https://host[/prefix]/rest/`
fn rest_base(url: &str) -> Result<Url, SourceError> {
    let trimmed = url.trim().trim_end_matches('/');
    let with_rest = if trimmed.ends_with("/rest") {
        format!("{trimmed}/")
    } else {
        format!("{trimmed}/rest/")
    };
    Url::parse(&with_rest).map_err(|e| SourceError::InvalidUrl(format!("{url}: {e}")))
}

#[async_trait]
impl EntitySource for ApiClient {
    async fn scans(&self) -> Result<Vec<Scan>, SourceError> {
        self.list("scan", SCAN_FIELDS, |s: &Scan| s.id.as_str()).await
    }

    async fn scan_results(&self) -> Result<Vec<ScanResult>, SourceError> {
        self.list("scanResult", SCAN_RESULT_FIELDS, |r: &ScanResult| r.id.as_str())
            .await
    }

    async fn scanners(&self) -> Result<Vec<Scanner>, SourceError> {
        self.list("scanner", SCANNER_FIELDS, |s: &Scanner| s.id.as_str()).await
    }

    async fn scan_zones(&self) -> Result<Vec<ScanZone>, SourceError> {
        self.list("zone", ZONE_FIELDS, |z: &ScanZone| z.id.as_str()).await
    }

    async fn jobs(&self) -> Result<Vec<Job>, SourceError> {
        self.list("job", JOB_FIELDS, |j: &Job| j.id.as_str()).await
    }

    async fn assets(&self) -> Result<Vec<Asset>, SourceError> {
        self.list("asset", ASSET_FIELDS, |a: &Asset| a.id.as_str()).await
    }

    async fn current_user(&self) -> Result<CurrentUser, SourceError> {
        self.get("currentUser", USER_FIELDS).await
    }
}

/// Builds API clients from the `tenablesc` section of the config
#[derive(Debug, Clone)]
pub struct ApiProvider {
    config: TenableScConfig,
}

impl ApiProvider {
    pub fn new(config: TenableScConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClientProvider for ApiProvider {
    type Client = ApiClient;

    async fn admin_client(&self) -> Result<ApiClient, MetricsError> {
        ApiClient::new(&self.config.url, &self.config.admin_credentials)
            .map_err(MetricsError::source("create admin client"))
    }

    fn org_names(&self) -> Vec<String> {
        self.config.org_names()
    }

    async fn org_client(&self, org_name: &str) -> Result<ApiClient, MetricsError> {
        let credentials = self
            .config
            .org_credentials
            .get(org_name)
            .ok_or_else(|| MetricsError::UnknownOrganization(org_name.to_string()))?;
        ApiClient::new(&self.config.url, credentials)
            .map_err(MetricsError::source("create organization client"))
    }
}
