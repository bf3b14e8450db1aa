//! Periodic cleanup of finished notification jobs.
//!
//! Deletes `SUCCESS` and `FAILURE` jobs that completed more than
//! `JOB_RETENTION_HOURS` ago. Pending and running jobs are never touched.

use std::sync::Arc;
use std::time::Duration;

use alertproxy_db::JobStore;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// Default retention period: 24 hours.
const DEFAULT_RETENTION_HOURS: i64 = 24;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the job retention loop until `cancel` is triggered.
pub async fn run(store: Arc<dyn JobStore>, cancel: CancellationToken) {
    let retention_hours: i64 = std::env::var("JOB_RETENTION_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RETENTION_HOURS);

    tracing::info!(
        retention_hours,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Job retention task started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention task stopping");
                break;
            }
            _ = interval.tick() => {
                purge_once(store.as_ref(), retention_hours).await;
            }
        }
    }
}

/// One cleanup pass. Failures are logged and retried on the next tick.
pub async fn purge_once(store: &dyn JobStore, retention_hours: i64) -> u64 {
    let cutoff = Utc::now() - chrono::Duration::hours(retention_hours);
    match store.purge_finished_before(cutoff).await {
        Ok(deleted) => {
            if deleted > 0 {
                tracing::info!(deleted, "Job retention: purged finished jobs");
            } else {
                tracing::debug!("Job retention: nothing to purge");
            }
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Job retention: cleanup failed");
            0
        }
    }
}
