/*!
Test harness for full aggregation cycles

Wraps a mock provider and a fixed clock, runs cycles and asserts on the
resulting snapshot by encoded metric key.
*/

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use sc_metrics_agent::error::MetricsError;
use sc_metrics_agent::metrics::tags::split_encoded;
use sc_metrics_agent::metrics::{tagged_metric_name, MetricSnapshot};

use crate::fixtures::fixed_now;
use crate::source_stub::MockProvider;

pub struct TestHarness {
    pub provider: MockProvider,
    now: DateTime<Utc>,
    last_snapshot: Option<MetricSnapshot>,
}

impl TestHarness {
    pub fn new(provider: MockProvider) -> Self {
        env_logger::try_init().ok();

        Self {
            provider,
            now: fixed_now(),
            last_snapshot: None,
        }
    }

    /// Runs one cycle. A failed cycle clears the previous snapshot.
    pub async fn collect(&mut self) -> Result<&MetricSnapshot, MetricsError> {
        self.last_snapshot = None;
        let snapshot = MetricSnapshot::collect(&self.provider, self.now).await?;
        log::info!("collected {} metrics", snapshot.len());
        Ok(self.last_snapshot.insert(snapshot))
    }

    pub fn snapshot(&self) -> Result<&MetricSnapshot> {
        self.last_snapshot
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no snapshot collected"))
    }

    pub fn assert_metric(&self, encoded_key: &str, expected: i64) -> Result<()> {
        match self.snapshot()?.get(encoded_key) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => anyhow::bail!(
                "Metric '{}' mismatch: expected {}, got {}",
                encoded_key, expected, actual
            ),
            None => anyhow::bail!(
                "Metric '{}' not found, snapshot has: {}",
                encoded_key,
                self.snapshot_json()?
            ),
        }
    }

    /// `assert_metric` with the key built from a metric name and its tags
    pub fn assert_tagged(&self, name: &str, tags: &[(&str, &str)], expected: i64) -> Result<()> {
        self.assert_metric(&tagged_metric_name(name, tags), expected)
    }

    pub fn assert_absent(&self, encoded_key: &str) -> Result<()> {
        if let Some(actual) = self.snapshot()?.get(encoded_key) {
            anyhow::bail!("Metric '{}' unexpectedly present with value {}", encoded_key, actual);
        }
        Ok(())
    }

    /// Snapshot as a JSON object, for failure messages
    pub fn snapshot_json(&self) -> Result<Value> {
        let map: serde_json::Map<String, Value> = self
            .snapshot()?
            .iter()
            .map(|(key, value)| (key.to_string(), Value::from(value)))
            .collect();
        Ok(Value::Object(map))
    }

    /// Entry counts per metric name
    pub fn get_stats(&self) -> Result<SnapshotStats> {
        let snapshot = self.snapshot()?;
        let mut by_metric = BTreeMap::new();
        for (key, _) in snapshot.iter() {
            let (name, _) = split_encoded(key);
            *by_metric.entry(name.to_string()).or_insert(0) += 1;
        }

        Ok(SnapshotStats {
            total_metrics: snapshot.len(),
            by_metric,
        })
    }
}

#[derive(Debug)]
pub struct SnapshotStats {
    pub total_metrics: usize,
    pub by_metric: BTreeMap<String, usize>,
}

impl SnapshotStats {
    pub fn print(&self) {
        println!("Snapshot statistics:");
        println!("  Total metrics: {}", self.total_metrics);
        for (name, count) in &self.by_metric {
            println!("    {}: {}", name, count);
        }
    }
}
