//! Parsing of the small duration language used in alert annotations.
//!
//! A duration is an integer followed by one of `ms`, `s`, `m`, `h`, `d`
//! (case-insensitive, surrounding whitespace allowed), e.g. `30s`, `5m`,
//! `1h`, `2d`, `500ms`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*(ms|s|m|h|d)\s*$").expect("valid regex")
});

const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_HOUR: f64 = 3_600.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// Parse a duration string into (possibly fractional) seconds.
pub fn parse_duration_secs(value: &str) -> Result<f64, CoreError> {
    let caps = DURATION_RE
        .captures(value)
        .ok_or_else(|| CoreError::InvalidDuration(value.to_string()))?;

    let amount: u64 = caps[1]
        .parse()
        .map_err(|_| CoreError::InvalidDuration(value.to_string()))?;
    let amount = amount as f64;

    let secs = match caps[2].to_ascii_lowercase().as_str() {
        "ms" => amount / 1_000.0,
        "s" => amount,
        "m" => amount * SECS_PER_MINUTE,
        "h" => amount * SECS_PER_HOUR,
        "d" => amount * SECS_PER_DAY,
        _ => return Err(CoreError::InvalidDuration(value.to_string())),
    };

    Ok(secs)
}

/// Convert fractional seconds into whole nanoseconds, saturating at `i64::MAX`.
pub fn secs_to_nanos(secs: f64) -> i64 {
    let nanos = secs * 1_000_000_000.0;
    if nanos >= i64::MAX as f64 {
        i64::MAX
    } else if nanos <= 0.0 {
        0
    } else {
        nanos as i64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
