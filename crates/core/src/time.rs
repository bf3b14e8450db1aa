//! Conversions between RFC 3339 strings, UTC timestamps and Unix nanoseconds.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::{Timestamp, UnixNanos};

/// Parse an RFC 3339 timestamp (`2026-01-15T12:34:56.789Z`) into UTC.
///
/// Returns `None` for empty or malformed input.
pub fn parse_rfc3339(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Unix nanoseconds for `ts`, clamped to the representable non-negative range.
pub fn to_unix_nanos(ts: Timestamp) -> UnixNanos {
    match ts.timestamp_nanos_opt() {
        Some(ns) => ns.max(0),
        None if ts.timestamp() < 0 => 0,
        None => UnixNanos::MAX,
    }
}

pub fn from_unix_nanos(ns: UnixNanos) -> Timestamp {
    DateTime::from_timestamp_nanos(ns)
}

/// RFC 3339 rendering of a nanosecond timestamp, e.g. `2026-01-15T12:34:56.789+00:00`.
pub fn nanos_to_rfc3339(ns: UnixNanos) -> String {
    from_unix_nanos(ns).to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
