use alertproxy_core::log::{Direction, LogEntry};
use alertproxy_core::types::UnixNanos;
use async_trait::async_trait;

use crate::error::LokiError;

/// Parameters of one range query. Bounds are inclusive nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub query: String,
    pub start_ns: UnixNanos,
    pub end_ns: UnixNanos,
    pub limit: usize,
    pub direction: Direction,
}

impl RangeQuery {
    pub fn new(
        query: impl Into<String>,
        start_ns: UnixNanos,
        end_ns: UnixNanos,
        limit: usize,
        direction: Direction,
    ) -> Self {
        Self {
            query: query.into(),
            start_ns,
            end_ns,
            limit,
            direction,
        }
    }

    /// A query that cannot return anything and need not be sent.
    pub fn is_empty(&self) -> bool {
        self.limit == 0 || self.end_ns < self.start_ns
    }
}

/// A log backend that can check query syntax and run range queries.
///
/// Implementations are long-lived and shared across requests without
/// locking, so they must not hold per-call mutable state.
#[async_trait]
pub trait LogBackend: Send + Sync {
    /// Check `query` and return its normalized form.
    async fn validate_query(&self, query: &str) -> Result<String, LokiError>;

    /// Run a range query. Results are ascending by timestamp for
    /// [`Direction::Forward`] and descending for [`Direction::Backward`].
    async fn query_range(&self, query: &RangeQuery) -> Result<Vec<LogEntry>, LokiError>;
}
