//! Resolution of extraction tunables from alert annotations.
//!
//! Every tunable is looked up per-alert first, then in the common
//! annotations, then in [`ExtractSettings`]. The first non-empty value wins.

use crate::alert::AlertEvent;
use crate::duration::parse_duration_secs;
use crate::error::CoreError;

pub const ANNOTATION_QUERY_MATCH: &str = "query_match";
pub const ANNOTATION_CONTEXT_BEFORE: &str = "context_before";
pub const ANNOTATION_CONTEXT_AFTER: &str = "context_after";
pub const ANNOTATION_CONTEXT_TIME_RANGE: &str = "context_time_range";
pub const ANNOTATION_SEARCH_WINDOW: &str = "search_window";
pub const ANNOTATION_MAX_MATCHES: &str = "max_matches";

// ---------------------------------------------------------------------------
// ExtractSettings
// ---------------------------------------------------------------------------

/// Configured defaults used when an annotation is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSettings {
    pub context_before: usize,
    pub context_after: usize,
    pub context_time_range: String,
    pub search_window: String,
    pub max_matches: usize,
    /// Fallback selection expression. `None` means the webhook must carry one.
    pub default_query_match: Option<String>,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            context_before: 2,
            context_after: 2,
            context_time_range: "30m".to_string(),
            search_window: "5m".to_string(),
            max_matches: 3,
            default_query_match: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AnnotationLookup
// ---------------------------------------------------------------------------

/// Tunables resolved for one extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationLookup {
    /// `None` when neither the event nor the settings provide one.
    pub query_match: Option<String>,
    pub context_before: usize,
    pub context_after: usize,
    /// As written, e.g. `"30m"`.
    pub context_time_range: String,
    pub context_time_range_secs: f64,
    /// As written, e.g. `"5m"`.
    pub search_window: String,
    pub search_window_secs: f64,
    pub max_matches: usize,
}

impl AnnotationLookup {
    /// Resolve all tunables for `event`.
    ///
    /// Durations and counts are parsed here so a bad value fails the
    /// extraction up front instead of surfacing mid-query.
    pub fn resolve(event: &AlertEvent, settings: &ExtractSettings) -> Result<Self, CoreError> {
        let query_match = event.annotation(ANNOTATION_QUERY_MATCH).or_else(|| {
            settings
                .default_query_match
                .clone()
                .filter(|q| !q.trim().is_empty())
        });

        let context_before =
            resolve_count(event, ANNOTATION_CONTEXT_BEFORE, settings.context_before)?;
        let context_after =
            resolve_count(event, ANNOTATION_CONTEXT_AFTER, settings.context_after)?;
        let max_matches = resolve_count(event, ANNOTATION_MAX_MATCHES, settings.max_matches)?;

        let search_window = event
            .annotation(ANNOTATION_SEARCH_WINDOW)
            .unwrap_or_else(|| settings.search_window.clone());
        let context_time_range = event
            .annotation(ANNOTATION_CONTEXT_TIME_RANGE)
            .unwrap_or_else(|| settings.context_time_range.clone());

        let search_window_secs = parse_duration_secs(&search_window)?;
        let context_time_range_secs = parse_duration_secs(&context_time_range)?;

        Ok(Self {
            query_match,
            context_before,
            context_after,
            context_time_range,
            context_time_range_secs,
            search_window,
            search_window_secs,
            max_matches,
        })
    }
}

fn resolve_count(
    event: &AlertEvent,
    key: &'static str,
    default: usize,
) -> Result<usize, CoreError> {
    match event.annotation(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| CoreError::InvalidAnnotation {
                key,
                message: format!("expected a non-negative integer, got {raw:?}"),
            }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
