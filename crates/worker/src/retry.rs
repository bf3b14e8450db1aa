use std::future::Future;
use std::time::Duration;

use alertproxy_core::types::JobId;
use alertproxy_db::StoreError;

/// Whether retrying the same write could succeed.
fn is_transient(err: &StoreError) -> bool {
    matches!(err, StoreError::Database(_))
}

/// Run a job-state write, retrying transient failures after a fixed delay.
///
/// Returns `false` when the write never landed; the job is then stuck in
/// its previous state and has been logged as such.
pub(crate) async fn with_store_retry<F, Fut>(
    job_id: JobId,
    action: &'static str,
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match op().await {
            Ok(()) => return true,
            Err(e) if is_transient(&e) && attempt < attempts => {
                tracing::warn!(
                    %job_id,
                    action,
                    attempt,
                    error = %e,
                    "Job state write failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(
                    %job_id,
                    action,
                    attempt,
                    error = %e,
                    "Job state write failed, job is stuck"
                );
                return false;
            }
        }
    }
    false
}
