//! Fixed-interval collection loop
//!
//! Each tick runs one aggregation cycle and emits its snapshot. A failed
//! cycle is reported through the `failedUpdate` gauge and retried on the next
//! tick; the previous snapshot is never re-sent.

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::emitter::Emitter;
use crate::metrics::MetricSnapshot;
use crate::source::ClientProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Emitted { metrics: usize },
    Failed { consecutive_failures: i64 },
}

pub struct Scheduler<P> {
    provider: P,
    emitter: Emitter,
    interval: Duration,
    failed_updates: i64,
}

impl<P: ClientProvider> Scheduler<P> {
    pub fn new(provider: P, emitter: Emitter, interval: Duration) -> Self {
        Self {
            provider,
            emitter,
            interval,
            failed_updates: 0,
        }
    }

    /// Consecutive failed cycles so far
    pub fn failed_updates(&self) -> i64 {
        self.failed_updates
    }

    /// Collect and emit once. Only emitter failures are returned as errors.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        debug!("entering emit cycle");

        match MetricSnapshot::collect(&self.provider, Utc::now()).await {
            Ok(snapshot) => {
                self.failed_updates = 0;
                for (key, value) in &snapshot {
                    debug!(metric = %key, value, "updating metric");
                }
                let metrics = self.emitter.emit_snapshot(&snapshot).await?;
                Ok(CycleOutcome::Emitted { metrics })
            }
            Err(e) => {
                self.failed_updates += 1;
                error!(error = %e, failures = self.failed_updates, "failed to collect metrics");
                self.emitter.emit_failure(self.failed_updates).await?;
                Ok(CycleOutcome::Failed {
                    consecutive_failures: self.failed_updates,
                })
            }
        }
    }

    /// Runs immediately, then every interval until Ctrl-C (or after one cycle with `once`).
    /// Ctrl-C also interrupts a cycle in progress.
    pub async fn run(&mut self, once: bool) -> Result<()> {
        info!(interval = ?self.interval, once, dry_run = self.emitter.is_dry_run(), "Starting emit loop...");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // One listener for the whole loop so a signal is never missed between polls
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}

                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping emit loop");
                    break;
                }
            }

            tokio::select! {
                outcome = self.run_cycle() => {
                    outcome?;
                }

                _ = &mut shutdown => {
                    info!("Shutdown requested during cycle, stopping emit loop");
                    break;
                }
            }

            if once {
                info!("Terminating due to once flag");
                break;
            }
            debug!(sleep = ?self.interval, "sleeping between updates");
        }

        Ok(())
    }
}
