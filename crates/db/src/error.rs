use alertproxy_core::job::JobState;
use alertproxy_core::types::JobId;

/// Re-exported so callers can match on database errors without depending on sqlx.
pub use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    #[error("Corrupt job row {id}: {message}")]
    Corrupt { id: JobId, message: String },
}
