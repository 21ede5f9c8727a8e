//! sc-metrics agent - Tenable.sc health and freshness metrics for DogStatsD
//!
//! Each cycle reads scanners, zones, jobs, scans, scan results and assets
//! from Tenable.sc and reduces them to one snapshot of integer gauges:
//! - Scanner health, globally and per scan zone
//! - Job queue length and jobs that never started
//! - Minutes since each scan last produced a result, and its duration
//! - IP counts per asset

pub mod client;
pub mod config;
pub mod emitter;
pub mod entities;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod source;

pub use config::AgentConfig;
pub use error::{ConfigError, MetricsError, SourceError};
pub use metrics::{MetricKey, MetricSnapshot};
pub use source::{ClientProvider, EntitySource};
