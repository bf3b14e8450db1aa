//! Log lines returned by the log backend and the contexts built around them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::UnixNanos;

/// Scan direction for a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "FORWARD",
            Direction::Backward => "BACKWARD",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log line with its stream labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub ts_ns: UnixNanos,
    pub line: String,
    pub stream: BTreeMap<String, String>,
}

/// A matched line together with the lines surrounding it.
///
/// `before` and `after` are both in forward chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchContext {
    pub ts_ns: UnixNanos,
    pub ts_iso: String,
    pub line: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// The stream selector part of a query: everything before the first pipe
/// that is outside the label matcher braces and quoted strings.
///
/// ```
/// use alertproxy_core::log::base_selector;
///
/// assert_eq!(base_selector(r#"{job="api"} |= "ERROR""#), r#"{job="api"}"#);
/// assert_eq!(base_selector(r#"{job=~"a|b"} | json"#), r#"{job=~"a|b"}"#);
/// ```
pub fn base_selector(query: &str) -> &str {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in query.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' && q != '`' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '`' => quote = Some(ch),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => return query[..idx].trim(),
            _ => {}
        }
    }

    query.trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
