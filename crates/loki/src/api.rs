//! HTTP client for the Loki query API.
//!
//! Wraps `GET /loki/api/v1/format_query` (syntax check) and
//! `GET /loki/api/v1/query_range` using [`reqwest`]. Every request carries
//! the configured timeout.

use std::time::Duration;

use alertproxy_core::log::LogEntry;
use async_trait::async_trait;

use crate::backend::{LogBackend, RangeQuery};
use crate::error::LokiError;
use crate::response::{normalize, ErrorResponse, FormatQueryResponse, QueryRangeResponse};

const FORMAT_QUERY_PATH: &str = "/loki/api/v1/format_query";
const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";

/// Default Loki base URL.
const DEFAULT_BASE_URL: &str = "http://localhost:3100";

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// LokiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LokiConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl LokiConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable            | Default                 |
    /// |---------------------|-------------------------|
    /// | `LOKI_BASE_URL`     | `http://localhost:3100` |
    /// | `LOKI_TIMEOUT_SECS` | `10`                    |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("LOKI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs: u64 = std::env::var("LOKI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(base_url, Duration::from_secs(timeout_secs))
    }
}

// ---------------------------------------------------------------------------
// LokiClient
// ---------------------------------------------------------------------------

/// Shared, pooled client for one Loki instance.
pub struct LokiClient {
    client: reqwest::Client,
    base_url: String,
}

impl LokiClient {
    pub fn new(config: &LokiConfig) -> Result<Self, LokiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    /// Read the body of a non-2xx response.
    async fn error_body(response: reqwest::Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string())
    }
}

#[async_trait]
impl LogBackend for LokiClient {
    async fn validate_query(&self, query: &str) -> Result<String, LokiError> {
        let response = self
            .client
            .get(format!("{}{FORMAT_QUERY_PATH}", self.base_url))
            .query(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = Self::error_body(response).await;
            return Err(LokiError::InvalidQuery {
                status: status.as_u16(),
                message: ErrorResponse::message_from(&body),
            });
        }
        if !status.is_success() {
            return Err(LokiError::ApiError {
                status: status.as_u16(),
                body: Self::error_body(response).await,
            });
        }

        let body = response.text().await?;
        let parsed: FormatQueryResponse =
            serde_json::from_str(&body).map_err(|e| LokiError::Decode(e.to_string()))?;
        Ok(parsed.data)
    }

    async fn query_range(&self, query: &RangeQuery) -> Result<Vec<LogEntry>, LokiError> {
        let start = query.start_ns.to_string();
        let end = query.end_ns.to_string();
        let limit = query.limit.to_string();

        let response = self
            .client
            .get(format!("{}{QUERY_RANGE_PATH}", self.base_url))
            .query(&[
                ("query", query.query.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("limit", limit.as_str()),
                ("direction", query.direction.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LokiError::ApiError {
                status: status.as_u16(),
                body: Self::error_body(response).await,
            });
        }

        let body = response.text().await?;
        let parsed: QueryRangeResponse =
            serde_json::from_str(&body).map_err(|e| LokiError::Decode(e.to_string()))?;
        let entries = normalize(parsed, query.direction)?;

        tracing::debug!(
            query = %query.query,
            direction = %query.direction,
            limit = query.limit,
            returned = entries.len(),
            "Loki range query completed"
        );
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
