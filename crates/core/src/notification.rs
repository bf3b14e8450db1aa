//! Render payloads, rendered notifications and delivery reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::log::MatchContext;

/// A channel-agnostic rendered message. The body is plain text; adapters
/// apply their own formatting and length limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Everything a template can reference. Produced by extraction, consumed
/// by the registry inside a background job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    /// `"[{STATUS}] {alertname}"`.
    pub title: String,
    pub status: String,
    pub alertname: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// The validated selection expression used for the match query.
    pub query: String,
    /// Stream selector used for the context queries.
    pub selector: String,
    pub search_window: String,
    pub context_time_range: String,
    pub context_before: usize,
    pub context_after: usize,
    pub max_matches: usize,
    pub contexts: Vec<MatchContext>,
}

impl RenderPayload {
    pub fn make_title(status: &str, alertname: &str) -> String {
        format!("[{}] {alertname}", status.to_uppercase())
    }
}

/// Outcome of one registry fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Channel name to "at least one recipient accepted".
    pub channels: BTreeMap<String, bool>,
    /// `"<channel>: <error>"` for every channel whose send raised.
    pub errors: Vec<String>,
}

impl DeliveryReport {
    pub fn succeeded(&self) -> usize {
        self.channels.values().filter(|ok| **ok).count()
    }

    pub fn failed(&self) -> usize {
        self.channels.len() - self.succeeded()
    }
}
