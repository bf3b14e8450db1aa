//! Alert webhook schema (Grafana unified alerting / Alertmanager format).
//!
//! Every field is optional on the wire. Unknown fields are preserved in
//! `extra` so nothing the sender includes is lost, but only the fields below
//! drive extraction.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::time::parse_rfc3339;
use crate::types::Timestamp;

/// Raw label or annotation values as sent by the webhook.
pub type LabelMap = BTreeMap<String, Value>;

/// Fallback used when no `alertname` label can be found anywhere.
pub const NO_ALERTNAME: &str = "(no alertname)";

/// Fallback used when the webhook carries no `status`.
pub const UNKNOWN_STATUS: &str = "unknown";

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// One alert inside the webhook's `alerts` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: LabelMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: LabelMap,
    #[serde(default)]
    pub starts_at: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default, rename = "generatorURL")]
    pub generator_url: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// ---------------------------------------------------------------------------
// AlertEvent
// ---------------------------------------------------------------------------

/// A normalized inbound alert webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    #[serde(default)]
    pub status: Option<String>,
    /// Always a list: `null` or a non-list value deserialize as empty.
    #[serde(default, deserialize_with = "lenient_alerts")]
    pub alerts: Vec<Alert>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_labels: LabelMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub common_labels: LabelMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub common_annotations: LabelMap,
    #[serde(default, rename = "externalURL")]
    pub external_url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub group_key: Option<String>,
    #[serde(default)]
    pub truncated_alerts: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AlertEvent {
    /// Validate an arbitrary JSON body against the webhook schema.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        if !value.is_object() {
            return Err(CoreError::Validation(
                "alert webhook body must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(format!("invalid alert webhook payload: {e}")))
    }

    /// The event status (`firing`, `resolved`, ...) or `"unknown"`.
    pub fn status_or_unknown(&self) -> String {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_STATUS)
            .to_string()
    }

    /// Resolve a label from `commonLabels`, then from the first alert.
    pub fn label(&self, key: &str) -> Option<String> {
        self.common_labels
            .get(key)
            .and_then(value_as_text)
            .or_else(|| {
                self.alerts
                    .first()
                    .and_then(|a| a.labels.get(key))
                    .and_then(value_as_text)
            })
    }

    /// Resolve the alert name: common labels, first alert, group labels, then a literal fallback.
    pub fn alertname(&self) -> String {
        self.label("alertname")
            .or_else(|| self.group_labels.get("alertname").and_then(value_as_text))
            .unwrap_or_else(|| NO_ALERTNAME.to_string())
    }

    /// Resolve an annotation: the first alert carrying a non-empty value
    /// wins, then `commonAnnotations`.
    pub fn annotation(&self, key: &str) -> Option<String> {
        self.alerts
            .iter()
            .find_map(|a| a.annotations.get(key).and_then(value_as_text))
            .or_else(|| self.common_annotations.get(key).and_then(value_as_text))
    }

    /// The latest parseable `startsAt` across all alerts.
    pub fn latest_start(&self) -> Option<Timestamp> {
        self.alerts
            .iter()
            .filter_map(|a| a.starts_at.as_deref())
            .filter_map(parse_rfc3339)
            .max()
    }

    pub fn common_labels_text(&self) -> BTreeMap<String, String> {
        text_map(&self.common_labels)
    }

    pub fn common_annotations_text(&self) -> BTreeMap<String, String> {
        text_map(&self.common_annotations)
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Render a label/annotation value as text. `null` and blank strings count
/// as absent.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_map(map: &LabelMap) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| value_as_text(v).map(|v| (k.clone(), v)))
        .collect()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_alerts<'de, D>(deserializer: D) -> Result<Vec<Alert>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn event(value: Value) -> AlertEvent {
        AlertEvent::from_value(value).expect("valid event")
    }

    #[test]
    fn null_and_non_list_alerts_become_empty() {
        assert!(event(json!({"alerts": null})).alerts.is_empty());
        assert!(event(json!({"alerts": "nope"})).alerts.is_empty());
        assert!(event(json!({"alerts": {"a": 1}})).alerts.is_empty());
        assert!(event(json!({})).alerts.is_empty());
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let e = event(json!({
            "status": "firing",
            "orgId": 1,
            "alerts": [{"labels": {}, "silenceURL": "http://x"}]
        }));
        assert_eq!(e.extra["orgId"], 1);
        assert_eq!(e.alerts[0].extra["silenceURL"], "http://x");
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert_matches!(
            AlertEvent::from_value(json!([1, 2])),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            AlertEvent::from_value(json!({"alerts": [{"labels": 5}]})),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn alertname_prefers_common_labels() {
        let e = event(json!({
            "commonLabels": {"alertname": "Common"},
            "alerts": [{"labels": {"alertname": "First"}}]
        }));
        assert_eq!(e.alertname(), "Common");
    }

    #[test]
    fn alertname_falls_back_through_first_alert_and_group_labels() {
        let e = event(json!({
            "commonLabels": {"alertname": ""},
            "alerts": [{"labels": {"alertname": "First"}}, {"labels": {"alertname": "Second"}}]
        }));
        assert_eq!(e.alertname(), "First");

        let e = event(json!({"groupLabels": {"alertname": "Group"}}));
        assert_eq!(e.alertname(), "Group");

        assert_eq!(event(json!({})).alertname(), NO_ALERTNAME);
    }

    #[test]
    fn annotation_prefers_per_alert_over_common() {
        let e = event(json!({
            "commonAnnotations": {"query_match": "{job=\"common\"}"},
            "alerts": [
                {"annotations": {"query_match": ""}},
                {"annotations": {"query_match": "{job=\"second\"}"}}
            ]
        }));
        assert_eq!(e.annotation("query_match").as_deref(), Some("{job=\"second\"}"));
    }

    #[test]
    fn empty_annotation_everywhere_is_absent() {
        let e = event(json!({
            "commonAnnotations": {"query_match": ""},
            "alerts": [{"annotations": {"query_match": null}}]
        }));
        assert_eq!(e.annotation("query_match"), None);
    }

    #[test]
    fn whitespace_annotation_falls_back_to_common() {
        let e = event(json!({
            "commonAnnotations": {"query_match": "{job=\"common\"}"},
            "alerts": [{"annotations": {"query_match": "  \t "}}]
        }));
        assert_eq!(e.annotation("query_match").as_deref(), Some("{job=\"common\"}"));
        assert_eq!(value_as_text(&json!(" \n")), None);
    }

    #[test]
    fn numeric_annotation_values_are_stringified() {
        let e = event(json!({"commonAnnotations": {"max_matches": 5}}));
        assert_eq!(e.annotation("max_matches").as_deref(), Some("5"));
    }

    #[test]
    fn latest_start_ignores_unparseable_values() {
        let e = event(json!({
            "alerts": [
                {"startsAt": "2026-01-15T12:00:00Z"},
                {"startsAt": "garbage"},
                {"startsAt": "2026-01-15T12:05:00Z"},
                {}
            ]
        }));
        assert_eq!(
            e.latest_start(),
            parse_rfc3339("2026-01-15T12:05:00Z")
        );
        assert!(event(json!({"alerts": [{"startsAt": "x"}]})).latest_start().is_none());
    }

    #[test]
    fn status_defaults_to_unknown() {
        assert_eq!(event(json!({})).status_or_unknown(), "unknown");
        assert_eq!(event(json!({"status": "resolved"})).status_or_unknown(), "resolved");
    }

    #[test]
    fn text_maps_skip_nulls() {
        let e = event(json!({"commonLabels": {"job": "api", "gone": null, "code": 500}}));
        let labels = e.common_labels_text();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["job"], "api");
        assert_eq!(labels["code"], "500");
    }
}
