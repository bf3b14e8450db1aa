use alertproxy_core::job::{JobOutcome, JobRecord, JobStatus};
use alertproxy_core::types::{JobId, Timestamp};
use async_trait::async_trait;

use crate::error::StoreError;

/// Durable record of job states.
///
/// Transitions are atomic: of two racing writers for the same edge,
/// exactly one succeeds and the other gets
/// [`StoreError::InvalidTransition`].
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `PENDING` job and return its id.
    async fn create(&self) -> Result<JobId, StoreError>;

    /// `PENDING -> STARTED`.
    async fn mark_started(&self, id: JobId) -> Result<(), StoreError>;

    /// `STARTED -> SUCCESS | FAILURE`, recording the result or error.
    async fn complete(&self, id: JobId, outcome: &JobOutcome) -> Result<(), StoreError>;

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, StoreError>;

    /// What a poller sees. Unknown ids read as `PENDING`.
    async fn status(&self, id: JobId) -> Result<JobStatus, StoreError> {
        Ok(self
            .get(id)
            .await?
            .map(JobStatus::from)
            .unwrap_or_else(|| JobStatus::unknown(id)))
    }

    /// Delete terminal jobs completed before `cutoff`. Returns the number removed.
    async fn purge_finished_before(&self, cutoff: Timestamp) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
