//! DogStatsD gauge emitter
//!
//! Turns a snapshot into `tenablesc.<name>:<value>|g|#<tags>` lines. The
//! canonical key's bracketed tags become DogStatsD tags, followed by the
//! configured global tags. Lines are packed into datagrams below the usual
//! UDP payload limit.

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::metrics::tags::split_encoded;
use crate::metrics::{MetricSnapshot, FAILED_UPDATE};

pub const METRIC_PREFIX: &str = "tenablesc";

/// Keeps datagrams within a 1500 byte MTU after IP/UDP headers
const MAX_DATAGRAM_BYTES: usize = 1432;

enum Sink {
    Udp(UdpSocket),
    DryRun,
}

pub struct Emitter {
    sink: Sink,
    global_tags: Vec<String>,
}

impl Emitter {
    /// UDP emitter sending to `address` (`host:port`)
    pub async fn statsd(address: &str, global_tags: Vec<String>) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("Failed to bind statsd socket")?;
        socket
            .connect(address)
            .await
            .with_context(|| format!("Failed to resolve statsd address {address}"))?;

        debug!(address, tags = ?global_tags, "statsd emitter ready");
        Ok(Self {
            sink: Sink::Udp(socket),
            global_tags,
        })
    }

    /// Logs every gauge instead of sending it
    pub fn dry_run(global_tags: Vec<String>) -> Self {
        Self {
            sink: Sink::DryRun,
            global_tags,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self.sink, Sink::DryRun)
    }

    pub fn format_gauge(&self, encoded_key: &str, value: i64) -> String {
        let (name, tags) = split_encoded(encoded_key);
        let mut line = format!("{METRIC_PREFIX}.{name}:{value}|g");

        let all_tags: Vec<&str> = tags
            .into_iter()
            .chain(self.global_tags.iter().map(String::as_str))
            .collect();
        if !all_tags.is_empty() {
            line.push_str("|#");
            line.push_str(&all_tags.join(","));
        }
        line
    }

    /// Gauge lines for a successful cycle: every snapshot entry plus `failedUpdate:0`
    pub fn snapshot_lines(&self, snapshot: &MetricSnapshot) -> Vec<String> {
        snapshot
            .iter()
            .map(|(key, value)| self.format_gauge(key, value))
            .chain(std::iter::once(self.format_gauge(FAILED_UPDATE, 0)))
            .collect()
    }

    pub async fn emit_snapshot(&self, snapshot: &MetricSnapshot) -> Result<usize> {
        let lines = self.snapshot_lines(snapshot);
        self.send(&lines).await?;
        Ok(lines.len())
    }

    /// Only the failure counter is reported when a cycle fails
    pub async fn emit_failure(&self, failed_updates: i64) -> Result<()> {
        let lines = [self.format_gauge(FAILED_UPDATE, failed_updates)];
        self.send(&lines).await
    }

    async fn send(&self, lines: &[String]) -> Result<()> {
        match &self.sink {
            Sink::DryRun => {
                for line in lines {
                    info!(metric = %line, "dry-run gauge");
                }
                Ok(())
            }
            Sink::Udp(socket) => {
                for datagram in pack_datagrams(lines, MAX_DATAGRAM_BYTES) {
                    socket
                        .send(datagram.as_bytes())
                        .await
                        .context("Failed to send statsd datagram")?;
                }
                debug!(lines = lines.len(), "flushed gauges to statsd");
                Ok(())
            }
        }
    }
}

/// Newline-joined batches no larger than `limit` (a single oversized line is sent alone)
fn pack_datagrams(lines: &[String], limit: usize) -> Vec<String> {
    let mut datagrams = Vec::new();
    let mut current = String::new();

    for line in lines {
        if !current.is_empty() && current.len() + 1 + line.len() > limit {
            datagrams.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        datagrams.push(current);
    }

    datagrams
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricKey;

    #[test]
    fn test_format_gauge() {
        let emitter = Emitter::dry_run(vec!["env:test".into()]);
        assert_eq!(
            emitter.format_gauge("jobQueueLength", 4),
            "tenablesc.jobQueueLength:4|g|#env:test"
        );
        assert_eq!(
            emitter.format_gauge("ipCount[assetName:dmz,org:Acme]", 12),
            "tenablesc.ipCount:12|g|#assetName:dmz,org:Acme,env:test"
        );

        let untagged = Emitter::dry_run(Vec::new());
        assert_eq!(untagged.format_gauge("failedUpdate", 2), "tenablesc.failedUpdate:2|g");
    }

    #[test]
    fn test_snapshot_lines_include_failed_update_reset() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.insert(&MetricKey::new("totalScannerCount"), 3);
        let lines = Emitter::dry_run(Vec::new()).snapshot_lines(&snapshot);
        assert_eq!(
            lines,
            vec!["tenablesc.totalScannerCount:3|g", "tenablesc.failedUpdate:0|g"]
        );
    }

    #[test]
    fn test_pack_datagrams() {
        let lines: Vec<String> = (0..5).map(|i| format!("metric{i}:1|g")).collect();
        let packed = pack_datagrams(&lines, 30);
        assert!(packed.iter().all(|d| d.len() <= 30));
        assert_eq!(packed.join("\n"), lines.join("\n"));

        let big = vec!["x".repeat(50)];
        assert_eq!(pack_datagrams(&big, 30), big);
        assert!(pack_datagrams(&[], 30).is_empty());
    }

    #[tokio::test]
    async fn test_udp_emission() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = receiver.local_addr().unwrap().to_string();

        let emitter = Emitter::statsd(&address, vec!["site:lab".into()]).await.unwrap();
        assert!(!emitter.is_dry_run());

        let mut snapshot = MetricSnapshot::default();
        snapshot.insert(&MetricKey::new("jobsNotStarted"), 1);
        assert_eq!(emitter.emit_snapshot(&snapshot).await.unwrap(), 2);

        let mut buf = [0u8; 2048];
        let n = receiver.recv(&mut buf).await.unwrap();
        let payload = std::str::from_utf8(&buf[..n]).unwrap();
        assert_eq!(
            payload,
            "tenablesc.jobsNotStarted:1|g|#site:lab\ntenablesc.failedUpdate:0|g|#site:lab"
        );

        emitter.emit_failure(3).await.unwrap();
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"tenablesc.failedUpdate:3|g|#site:lab");
    }
}
