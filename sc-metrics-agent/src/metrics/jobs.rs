//! Job queue backlog: queue length, jobs overdue to start, per type counts

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::{MetricSnapshot, JOBS_NOT_STARTED, JOB_QUEUE_LENGTH, JOB_TYPE_TAG};
use crate::entities::Job;
use crate::error::MetricsError;
use crate::metrics::MetricKey;
use crate::source::EntitySource;

/// Slack between a job's targeted start and its real dispatch, in seconds
pub const JOB_START_GRACE_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQueue {
    pub length: i64,
    pub not_started: i64,
    pub by_type: BTreeMap<String, i64>,
}

pub fn job_queue(jobs: &[Job], now: DateTime<Utc>) -> JobQueue {
    let nowish_epoch = (now - Duration::seconds(JOB_START_GRACE_SECS)).timestamp();

    let mut queue = JobQueue {
        length: jobs.len() as i64,
        ..JobQueue::default()
    };

    for job in jobs {
        let raw = job.targeted_time.trim();
        if raw.is_empty() {
            debug!(job = %job.id, job_type = %job.job_type, "job has no targeted time yet, skipping");
            continue;
        }
        let targeted_time = match raw.parse::<i64>() {
            Ok(t) => t,
            Err(e) => {
                warn!(job = %job.id, job_type = %job.job_type, targeted_time = %job.targeted_time,
                      error = %e, "failed to parse targeted time as epoch time, skipping");
                continue;
            }
        };

        if targeted_time > 0 && targeted_time < nowish_epoch {
            queue.not_started += 1;
        }
        *queue.by_type.entry(job.job_type.clone()).or_insert(0) += 1;
    }

    queue
}

pub async fn collect_job_queue<S>(source: &S, now: DateTime<Utc>) -> Result<JobQueue, MetricsError>
where
    S: EntitySource + ?Sized,
{
    let jobs = source
        .jobs()
        .await
        .map_err(MetricsError::source("list jobs"))?;
    Ok(job_queue(&jobs, now))
}

impl JobQueue {
    pub fn record_into(&self, snapshot: &mut MetricSnapshot) {
        snapshot.insert(&MetricKey::new(JOB_QUEUE_LENGTH), self.length);
        snapshot.insert(&MetricKey::new(JOBS_NOT_STARTED), self.not_started);
        for (job_type, count) in &self.by_type {
            snapshot.insert(
                &MetricKey::new(JOB_QUEUE_LENGTH).tag(JOB_TYPE_TAG, job_type),
                *count,
            );
        }
    }
}
