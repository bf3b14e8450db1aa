use std::sync::Arc;

use alertproxy_core::notification::RenderPayload;
use alertproxy_core::types::JobId;
use alertproxy_db::{JobStore, StoreError};
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Job queue is full")]
    Full,

    #[error("Job queue is closed")]
    Closed,

    #[error("Failed to record job: {0}")]
    Store(#[from] StoreError),
}

/// A payload waiting for a worker.
#[derive(Debug)]
pub(crate) struct QueuedJob {
    pub id: JobId,
    pub payload: RenderPayload,
}

/// Producer side of the worker pool. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<QueuedJob>,
    store: Arc<dyn JobStore>,
}

impl JobQueue {
    pub(crate) fn new(sender: mpsc::Sender<QueuedJob>, store: Arc<dyn JobStore>) -> Self {
        Self { sender, store }
    }

    /// Record a `PENDING` job for `payload` and queue it.
    ///
    /// A queue slot is reserved before the job is recorded, so a full or
    /// closed queue never leaves an orphaned `PENDING` record behind.
    pub async fn enqueue(&self, payload: RenderPayload) -> Result<JobId, QueueError> {
        let permit = self.sender.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(()) => QueueError::Full,
            mpsc::error::TrySendError::Closed(()) => QueueError::Closed,
        })?;

        let id = self.store.create().await?;
        permit.send(QueuedJob { id, payload });

        tracing::debug!(job_id = %id, "Job enqueued");
        Ok(id)
    }
}
