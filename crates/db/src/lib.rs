//! Persistence of background notification jobs.
//!
//! [`JobStore`] is the seam between the worker pool, which records state
//! transitions, and the HTTP layer, which polls them. Two implementations
//! exist: [`InMemoryJobStore`] for single-process deployments and tests,
//! and [`PgJobStore`] backed by PostgreSQL.

pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

pub use error::StoreError;
pub use memory::InMemoryJobStore;
pub use pg::{create_pool, health_check, run_migrations, DbPool, PgJobStore};
pub use store::JobStore;
