use std::time::Duration;

/// Default bounded queue size.
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Attempts for each job-state write before the job is given up as stuck.
const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 3;

const DEFAULT_STORE_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub store_retry_attempts: u32,
    pub store_retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
            store_retry_delay: DEFAULT_STORE_RETRY_DELAY,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                | Default   |
    /// |-------------------------|-----------|
    /// | `WORKER_CONCURRENCY`    | CPU count |
    /// | `WORKER_QUEUE_CAPACITY` | `1024`    |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let parse = |name: &str| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
        };
        Self {
            concurrency: parse("WORKER_CONCURRENCY").unwrap_or(defaults.concurrency),
            queue_capacity: parse("WORKER_QUEUE_CAPACITY").unwrap_or(defaults.queue_capacity),
            ..defaults
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
