//! PostgreSQL job store over the `notification_jobs` table.

use alertproxy_core::job::{JobOutcome, JobRecord, JobState};
use alertproxy_core::types::{JobId, Timestamp};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;

use crate::error::StoreError;
use crate::store::JobStore;

pub type DbPool = sqlx::PgPool;

/// Column list for `notification_jobs` queries.
const COLUMNS: &str = "id, state, result, error, created_at, started_at, completed_at";

const MAX_CONNECTIONS: u32 = 10;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct JobRow {
    id: JobId,
    state: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
    created_at: Timestamp,
    started_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let state = row.state.parse::<JobState>().map_err(|e| StoreError::Corrupt {
            id: row.id,
            message: e.to_string(),
        })?;
        Ok(JobRecord {
            id: row.id,
            state,
            result: row.result,
            error: row.error,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// PgJobStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Explain why a guarded update touched no row.
    async fn rejected_transition(&self, id: JobId, to: JobState) -> StoreError {
        match self.get(id).await {
            Ok(Some(record)) => StoreError::InvalidTransition {
                id,
                from: record.state,
                to,
            },
            Ok(None) => StoreError::NotFound(id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self) -> Result<JobId, StoreError> {
        let id = JobId::new_v4();
        sqlx::query("INSERT INTO notification_jobs (id, state) VALUES ($1, $2)")
            .bind(id)
            .bind(JobState::Pending.as_str())
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn mark_started(&self, id: JobId) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE notification_jobs SET state = $2, started_at = NOW() \
             WHERE id = $1 AND state = $3",
        )
        .bind(id)
        .bind(JobState::Started.as_str())
        .bind(JobState::Pending.as_str())
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(self.rejected_transition(id, JobState::Started).await);
        }
        Ok(())
    }

    async fn complete(&self, id: JobId, outcome: &JobOutcome) -> Result<(), StoreError> {
        let (result, error) = match outcome {
            JobOutcome::Success(value) => (Some(value), None),
            JobOutcome::Failure(message) => (None, Some(message.as_str())),
        };
        let to = outcome.state();

        let done = sqlx::query(
            "UPDATE notification_jobs \
             SET state = $2, result = $3, error = $4, completed_at = NOW() \
             WHERE id = $1 AND state = $5",
        )
        .bind(id)
        .bind(to.as_str())
        .bind(result)
        .bind(error)
        .bind(JobState::Started.as_str())
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(self.rejected_transition(id, to).await);
        }
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM notification_jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(JobRecord::try_from)
            .transpose()
    }

    async fn purge_finished_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let done = sqlx::query(
            "DELETE FROM notification_jobs \
             WHERE state IN ($1, $2) AND completed_at < $3",
        )
        .bind(JobState::Success.as_str())
        .bind(JobState::Failure.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }
}
