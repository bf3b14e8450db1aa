//! Loki response bodies and their normalization.

use std::collections::BTreeMap;

use alertproxy_core::log::{Direction, LogEntry};
use serde::Deserialize;
use serde_json::Value;

use crate::error::LokiError;

/// The only result type that carries raw log lines.
pub const RESULT_TYPE_STREAMS: &str = "streams";

/// Body of `GET /loki/api/v1/query_range`.
#[derive(Debug, Deserialize)]
pub struct QueryRangeResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub data: QueryRangeData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRangeData {
    pub result_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub result: Vec<StreamBlock>,
}

/// One stream: its labels and `[ts_ns, line, ...]` tuples.
#[derive(Debug, Deserialize)]
pub struct StreamBlock {
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub stream: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub values: Vec<Value>,
}

/// Body of `GET /loki/api/v1/format_query`.
#[derive(Debug, Deserialize)]
pub struct FormatQueryResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub data: String,
}

/// Body Loki sends alongside a 4xx for a rejected query.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorResponse {
    /// Best human-readable message from an error body, falling back to the raw text.
    pub fn message_from(body: &str) -> String {
        serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| body.trim().to_string())
    }
}

/// Merge every stream block into one list ordered by timestamp.
///
/// Entries are sorted ascending, then reversed for [`Direction::Backward`].
/// Entries with an unparseable timestamp or line are dropped.
pub fn normalize(
    response: QueryRangeResponse,
    direction: Direction,
) -> Result<Vec<LogEntry>, LokiError> {
    if response.data.result_type != RESULT_TYPE_STREAMS {
        return Err(LokiError::UnexpectedResultType(response.data.result_type));
    }

    let mut entries: Vec<LogEntry> = response
        .data
        .result
        .into_iter()
        .flat_map(|block| {
            let stream = block.stream;
            block
                .values
                .into_iter()
                .filter_map(move |tuple| parse_tuple(&tuple, &stream))
        })
        .collect();

    // Stable sort keeps per-stream order for equal timestamps.
    entries.sort_by_key(|e| e.ts_ns);
    if direction == Direction::Backward {
        entries.reverse();
    }
    Ok(entries)
}

fn parse_tuple(tuple: &Value, stream: &BTreeMap<String, String>) -> Option<LogEntry> {
    let items = tuple.as_array()?;
    let ts_ns = items.first()?.as_str()?.trim().parse::<i64>().ok()?;
    let line = items.get(1)?.as_str()?.to_string();
    Some(LogEntry {
        ts_ns,
        line,
        stream: stream.clone(),
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
