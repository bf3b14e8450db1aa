//! Notification registry: renders a payload per channel and fans it out.
//!
//! Rendering happens first for every registered channel so a broken
//! template aborts the whole delivery before anything is sent. Sends then
//! run concurrently, each bounded by the registry's send timeout. A failing
//! channel never prevents the others from being attempted.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use alertproxy_core::channels::ChannelKind;
use alertproxy_core::notification::{DeliveryReport, Notification, RenderPayload};

use crate::delivery::{DeliveryError, NotificationSender};
use crate::render::{TemplateError, TemplateRenderer};

/// Default per-channel send budget.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Rendering template for {channel} failed: {source}")]
    TemplateRendering {
        channel: ChannelKind,
        #[source]
        source: TemplateError,
    },
}

// ---------------------------------------------------------------------------
// NotificationRegistry
// ---------------------------------------------------------------------------

pub struct NotificationRegistry {
    senders: BTreeMap<ChannelKind, Arc<dyn NotificationSender>>,
    templates: BTreeMap<ChannelKind, String>,
    renderer: Arc<dyn TemplateRenderer>,
    send_timeout: Duration,
}

impl NotificationRegistry {
    pub fn new(renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self {
            senders: BTreeMap::new(),
            templates: BTreeMap::new(),
            renderer,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Register `sender` for its channel, rendering with `template`.
    /// A second registration for the same channel replaces the first.
    pub fn register(&mut self, sender: Arc<dyn NotificationSender>, template: impl Into<String>) {
        let channel = sender.channel();
        self.templates.insert(channel, template.into());
        self.senders.insert(channel, sender);
    }

    pub fn channels(&self) -> Vec<ChannelKind> {
        self.senders.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Render `payload` once per registered channel.
    pub fn render_all(
        &self,
        payload: &RenderPayload,
    ) -> Result<Vec<(ChannelKind, Notification)>, RegistryError> {
        self.senders
            .keys()
            .map(|&channel| {
                let template = self
                    .templates
                    .get(&channel)
                    .map(String::as_str)
                    .unwrap_or(channel.as_str());
                self.renderer
                    .render(template, payload)
                    .map(|n| (channel, n))
                    .map_err(|source| RegistryError::TemplateRendering { channel, source })
            })
            .collect()
    }

    /// Render and deliver `payload` on every registered channel.
    ///
    /// Returns per-channel success; a channel whose send raised, timed out
    /// or reported no recipient reached is recorded as `false`.
    pub async fn send_all(&self, payload: &RenderPayload) -> Result<DeliveryReport, RegistryError> {
        let rendered = self.render_all(payload)?;

        let sends = rendered.iter().filter_map(|(channel, notification)| {
            let sender = self.senders.get(channel)?;
            Some(async move { (*channel, self.send_one(sender.as_ref(), notification).await) })
        });
        let results = futures::future::join_all(sends).await;

        let mut report = DeliveryReport::default();
        for (channel, result) in results {
            let ok = match result {
                Ok(ok) => ok,
                Err(e) => {
                    tracing::error!(%channel, error = %e, "Notification channel failed");
                    report.errors.push(format!("{channel}: {e}"));
                    false
                }
            };
            report.channels.insert(channel.to_string(), ok);
        }

        tracing::info!(
            alertname = %payload.alertname,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Notification fan-out finished"
        );
        Ok(report)
    }

    async fn send_one(
        &self,
        sender: &dyn NotificationSender,
        notification: &Notification,
    ) -> Result<bool, DeliveryError> {
        match tokio::time::timeout(self.send_timeout, sender.send(notification)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.send_timeout.as_secs())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
