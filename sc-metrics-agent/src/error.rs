//! Error types for the agent library
//!
//! - `SourceError`: a single Entity Source call failed (transport, auth, API envelope)
//! - `MetricsError`: an aggregation cycle was aborted
//! - `ConfigError`: the configuration file could not be loaded or is invalid

use std::num::ParseIntError;
use thiserror::Error;

/// Failure of one call against the Tenable.sc API
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status} from {endpoint}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    #[error("API error {code} from {endpoint}: {message}")]
    Api {
        endpoint: String,
        code: i64,
        message: String,
    },
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
    /// Used by test doubles and custom sources
    #[error("{0}")]
    Other(String),
}

/// Reason an aggregation cycle failed. No partial snapshot survives one of these.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to {operation}: {source}")]
    Source {
        operation: &'static str,
        #[source]
        source: SourceError,
    },
    #[error("no credentials configured for organization {0}")]
    UnknownOrganization(String),
    #[error("failed to parse {field} {value:?} of {entity}: {source}")]
    Parse {
        field: &'static str,
        entity: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl MetricsError {
    /// Wraps an Entity Source failure with the operation that produced it
    pub fn source(operation: &'static str) -> impl FnOnce(SourceError) -> Self {
        move |source| MetricsError::Source { operation, source }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed unmarshalling yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
