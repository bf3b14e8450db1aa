use std::collections::HashMap;

use alertproxy_core::job::{JobOutcome, JobRecord, JobState};
use alertproxy_core::types::{JobId, Timestamp};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::JobStore;

/// Process-local job store. Records are lost on restart.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Apply `update` under the write lock if `id` may move to `to`.
    async fn transition(
        &self,
        id: JobId,
        to: JobState,
        update: impl FnOnce(&mut JobRecord),
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !record.state.can_transition_to(to) {
            return Err(StoreError::InvalidTransition {
                id,
                from: record.state,
                to,
            });
        }
        record.state = to;
        update(record);
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self) -> Result<JobId, StoreError> {
        let id = JobId::new_v4();
        self.jobs.write().await.insert(id, JobRecord::pending(id));
        Ok(id)
    }

    async fn mark_started(&self, id: JobId) -> Result<(), StoreError> {
        self.transition(id, JobState::Started, |r| r.started_at = Some(Utc::now()))
            .await
    }

    async fn complete(&self, id: JobId, outcome: &JobOutcome) -> Result<(), StoreError> {
        self.transition(id, outcome.state(), |r| {
            r.completed_at = Some(Utc::now());
            match outcome {
                JobOutcome::Success(value) => r.result = Some(value.clone()),
                JobOutcome::Failure(message) => r.error = Some(message.clone()),
            }
        })
        .await
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn purge_finished_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, r| {
            !(r.state.is_terminal() && r.completed_at.is_some_and(|done| done < cutoff))
        });
        Ok((before - jobs.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alertproxy_core::job::JobStatus;
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn new_job_is_pending() {
        let store = InMemoryJobStore::new();
        let id = store.create().await.unwrap();
        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.state, JobState::Pending);
        assert!(record.started_at.is_none());
    }

    #[tokio::test]
    async fn success_path_records_result() {
        let store = InMemoryJobStore::new();
        let id = store.create().await.unwrap();
        store.mark_started(id).await.unwrap();
        store
            .complete(id, &JobOutcome::Success(json!({"channels": {"email": true}})))
            .await
            .unwrap();

        let status = store.status(id).await.unwrap();
        assert_eq!(status.state, JobState::Success);
        assert_eq!(status.result.unwrap()["channels"]["email"], true);

        let record = store.get(id).await.unwrap().unwrap();
        assert!(record.started_at.is_some());
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn failure_path_records_error() {
        let store = InMemoryJobStore::new();
        let id = store.create().await.unwrap();
        store.mark_started(id).await.unwrap();
        store
            .complete(id, &JobOutcome::Failure("template missing".into()))
            .await
            .unwrap();

        let status = store.status(id).await.unwrap();
        assert_eq!(status.state, JobState::Failure);
        assert_eq!(status.error.as_deref(), Some("template missing"));
    }

    #[tokio::test]
    async fn illegal_edges_are_rejected() {
        let store = InMemoryJobStore::new();
        let id = store.create().await.unwrap();

        assert_matches!(
            store.complete(id, &JobOutcome::Failure("x".into())).await,
            Err(StoreError::InvalidTransition { from: JobState::Pending, to: JobState::Failure, .. })
        );

        store.mark_started(id).await.unwrap();
        assert_matches!(
            store.mark_started(id).await,
            Err(StoreError::InvalidTransition { from: JobState::Started, .. })
        );

        store.complete(id, &JobOutcome::Success(json!({}))).await.unwrap();
        assert_matches!(
            store.complete(id, &JobOutcome::Failure("late".into())).await,
            Err(StoreError::InvalidTransition { from: JobState::Success, .. })
        );
        assert_eq!(store.status(id).await.unwrap().state, JobState::Success);
    }

    #[tokio::test]
    async fn unknown_id_reads_as_pending() {
        let store = InMemoryJobStore::new();
        let id = JobId::new_v4();
        assert_eq!(store.status(id).await.unwrap(), JobStatus::unknown(id));
        assert_matches!(store.mark_started(id).await, Err(StoreError::NotFound(missing)) if missing == id);
    }

    #[tokio::test]
    async fn racing_starts_have_one_winner() {
        let store = Arc::new(InMemoryJobStore::new());
        let id = store.create().await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.mark_started(id).await.is_ok() })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn purge_removes_only_old_terminal_jobs() {
        let store = InMemoryJobStore::new();
        let pending = store.create().await.unwrap();
        let running = store.create().await.unwrap();
        store.mark_started(running).await.unwrap();
        let done = store.create().await.unwrap();
        store.mark_started(done).await.unwrap();
        store.complete(done, &JobOutcome::Success(json!({}))).await.unwrap();

        assert_eq!(
            store
                .purge_finished_before(Utc::now() - chrono::Duration::hours(1))
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .purge_finished_before(Utc::now() + chrono::Duration::seconds(1))
                .await
                .unwrap(),
            1
        );
        assert!(store.get(done).await.unwrap().is_none());
        assert!(store.get(pending).await.unwrap().is_some());
        assert!(store.get(running).await.unwrap().is_some());
        assert_eq!(store.len().await, 2);
    }
}
