//! Context extraction: from an alert webhook to a queued notification job.
//!
//! For one [`AlertEvent`] the extractor
//!
//! 1. resolves the selection expression and tunables ([`AnnotationLookup`]),
//! 2. validates the expression against the log backend,
//! 3. runs one backward match query over the search window ending at the
//!    latest `startsAt`,
//! 4. fetches before/after context for every match on the base selector,
//! 5. enqueues the resulting [`RenderPayload`] and returns the job id.
//!
//! Everything up to the enqueue happens inside the request; nothing is sent
//! to a delivery channel from here.

use std::sync::Arc;

use alertproxy_core::alert::AlertEvent;
use alertproxy_core::annotation::{AnnotationLookup, ExtractSettings};
use alertproxy_core::duration::secs_to_nanos;
use alertproxy_core::error::CoreError;
use alertproxy_core::log::{base_selector, Direction, LogEntry, MatchContext};
use alertproxy_core::notification::RenderPayload;
use alertproxy_core::time::{nanos_to_rfc3339, to_unix_nanos};
use alertproxy_core::types::{JobId, UnixNanos};
use alertproxy_loki::{LogBackend, LokiError, RangeQuery};
use alertproxy_worker::{JobQueue, QueueError};
use futures::future::{try_join, try_join_all};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Invalid alert webhook payload: {0}")]
    InvalidPayload(String),

    #[error("No selection expression: set the query_match annotation or ALERT_DEFAULT_QUERY_MATCH")]
    MissingQuery,

    #[error("Invalid LogQL query {query:?}: {message}")]
    InvalidQuery { query: String, message: String },

    #[error(transparent)]
    Annotation(CoreError),

    #[error("Log backend error: {0}")]
    Backend(#[from] LokiError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl From<CoreError> for ExtractionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => ExtractionError::InvalidPayload(message),
            other => ExtractionError::Annotation(other),
        }
    }
}

// ---------------------------------------------------------------------------
// ContextExtractor
// ---------------------------------------------------------------------------

pub struct ContextExtractor {
    backend: Arc<dyn LogBackend>,
    settings: ExtractSettings,
    queue: JobQueue,
}

impl ContextExtractor {
    pub fn new(backend: Arc<dyn LogBackend>, settings: ExtractSettings, queue: JobQueue) -> Self {
        Self {
            backend,
            settings,
            queue,
        }
    }

    pub fn settings(&self) -> &ExtractSettings {
        &self.settings
    }

    /// Build the payload for `event` and enqueue it.
    pub async fn extract(&self, event: &AlertEvent) -> Result<JobId, ExtractionError> {
        let payload = self.build_payload(event).await?;
        let alertname = payload.alertname.clone();
        let matches = payload.contexts.len();

        let job_id = self.queue.enqueue(payload).await?;
        tracing::info!(%job_id, %alertname, matches, "Notification job enqueued");
        Ok(job_id)
    }

    /// Run every query for `event` and assemble the render payload.
    pub async fn build_payload(&self, event: &AlertEvent) -> Result<RenderPayload, ExtractionError> {
        let status = event.status_or_unknown();
        let alertname = event.alertname();

        let lookup = AnnotationLookup::resolve(event, &self.settings)?;
        let query_match = lookup
            .query_match
            .clone()
            .ok_or(ExtractionError::MissingQuery)?;
        let query = self.validate(&query_match).await?;
        tracing::info!(%alertname, %query, "Selection expression validated");

        let end_ns = to_unix_nanos(event.latest_start().unwrap_or_else(chrono::Utc::now));
        let start_ns = end_ns
            .saturating_sub(secs_to_nanos(lookup.search_window_secs))
            .max(0);

        let mut matches = self
            .run(RangeQuery::new(
                query.clone(),
                start_ns,
                end_ns,
                lookup.max_matches,
                Direction::Backward,
            ))
            .await?;
        matches.truncate(lookup.max_matches);
        tracing::debug!(%alertname, matches = matches.len(), start_ns, end_ns, "Match query finished");

        let selector = base_selector(&query).to_string();
        let range_ns = secs_to_nanos(lookup.context_time_range_secs);
        let contexts = try_join_all(
            matches
                .iter()
                .map(|m| self.context_for(m, &selector, range_ns, &lookup)),
        )
        .await?;

        Ok(RenderPayload {
            title: RenderPayload::make_title(&status, &alertname),
            status,
            alertname,
            labels: event.common_labels_text(),
            annotations: event.common_annotations_text(),
            query,
            selector,
            search_window: lookup.search_window,
            context_time_range: lookup.context_time_range,
            context_before: lookup.context_before,
            context_after: lookup.context_after,
            max_matches: lookup.max_matches,
            contexts,
        })
    }

    /// Round-trip `query` through the backend's syntax check.
    async fn validate(&self, query: &str) -> Result<String, ExtractionError> {
        match self.backend.validate_query(query).await {
            Ok(normalized) => Ok(normalized),
            Err(LokiError::InvalidQuery { message, .. }) => Err(ExtractionError::InvalidQuery {
                query: query.to_string(),
                message,
            }),
            Err(e) => Err(ExtractionError::Backend(e)),
        }
    }

    /// Before/after lines around one match, both in chronological order.
    async fn context_for(
        &self,
        entry: &LogEntry,
        selector: &str,
        range_ns: UnixNanos,
        lookup: &AnnotationLookup,
    ) -> Result<MatchContext, ExtractionError> {
        let ts = entry.ts_ns;
        let before = RangeQuery::new(
            selector,
            ts.saturating_sub(range_ns).max(0),
            ts.saturating_sub(1).max(0),
            lookup.context_before,
            Direction::Backward,
        );
        let after = RangeQuery::new(
            selector,
            ts.saturating_add(1),
            ts.saturating_add(range_ns),
            lookup.context_after,
            Direction::Forward,
        );

        let (before, after) = try_join(self.run(before), self.run(after)).await?;

        Ok(MatchContext {
            ts_ns: ts,
            ts_iso: nanos_to_rfc3339(ts),
            line: entry.line.clone(),
            // Fetched newest-first; present oldest-first.
            before: before.into_iter().rev().map(|e| e.line).collect(),
            after: after.into_iter().map(|e| e.line).collect(),
        })
    }

    async fn run(&self, query: RangeQuery) -> Result<Vec<LogEntry>, ExtractionError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.backend.query_range(&query).await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
