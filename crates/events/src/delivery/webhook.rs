//! Webhook delivery with bounded retry.
//!
//! [`WebhookDelivery`] POSTs `{"title", "body"}` JSON to every configured
//! URL. A failed attempt is retried after each of the configured delays
//! (1 s, 2 s by default) before the URL is given up on.

use std::time::Duration;

use alertproxy_core::channels::ChannelKind;
use alertproxy_core::notification::Notification;
use async_trait::async_trait;

use super::{DeliveryError, NotificationSender};
use crate::config::split_list;

/// Delays before each retry.
const DEFAULT_RETRY_DELAYS: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub urls: Vec<String>,
    pub retry_delays: Vec<Duration>,
}

impl WebhookConfig {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        }
    }

    /// Returns `None` if `WEBHOOK_URLS` is unset or lists no URL.
    pub fn from_env() -> Option<Self> {
        let urls = split_list(&std::env::var("WEBHOOK_URLS").ok()?);
        if urls.is_empty() {
            return None;
        }
        Some(Self::new(urls))
    }
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

pub struct WebhookDelivery {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookDelivery {
    pub fn new(config: WebhookConfig) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Deliver a payload to one URL, retrying after each configured delay.
    pub async fn deliver(&self, url: &str, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let mut delays = self.config.retry_delays.iter();
        let mut attempt = 1usize;
        loop {
            match self.try_send(url, payload).await {
                Ok(()) => return Ok(()),
                Err(e) => match delays.next() {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            url,
                            error = %e,
                            "Webhook delivery attempt failed, retrying"
                        );
                        tokio::time::sleep(*delay).await;
                        attempt += 1;
                    }
                    None => {
                        tracing::error!(url, attempts = attempt, error = %e, "Webhook delivery failed after all retries");
                        return Err(e);
                    }
                },
            }
        }
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for WebhookDelivery {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, notification: &Notification) -> Result<bool, DeliveryError> {
        let payload = serde_json::json!({
            "title": notification.title,
            "body": notification.body,
        });

        let results =
            futures::future::join_all(self.config.urls.iter().map(|url| self.deliver(url, &payload)))
                .await;
        let delivered = results.iter().filter(|r| r.is_ok()).count();

        tracing::info!(
            total = self.config.urls.len(),
            delivered,
            "Webhook fan-out finished"
        );
        Ok(delivered > 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
