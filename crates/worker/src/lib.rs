//! In-process background execution of notification jobs.
//!
//! [`WorkerPool::start`] spawns a fixed number of worker tasks sharing one
//! bounded queue and hands back the [`JobQueue`] producers enqueue into.
//! Each job moves `PENDING -> STARTED -> SUCCESS | FAILURE` in the
//! [`JobStore`](alertproxy_db::JobStore).

pub mod config;
pub mod pool;
pub mod queue;
mod retry;

pub use config::WorkerConfig;
pub use pool::WorkerPool;
pub use queue::{JobQueue, QueueError};
