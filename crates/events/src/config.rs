//! Channel configuration and registry assembly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alertproxy_core::channels::{parse_channel_list, ChannelKind};

use crate::delivery::{
    EmailConfig, EmailDelivery, NotificationSender, TelegramConfig, TelegramDelivery,
    WebhookConfig, WebhookDelivery,
};
use crate::registry::{NotificationRegistry, DEFAULT_SEND_TIMEOUT};
use crate::render::{HandlebarsRenderer, TemplateError};

/// Split a comma-separated list, stripping surrounding quotes and blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Which channels to enable and how to reach them.
#[derive(Debug, Clone)]
pub struct ChannelsConfig {
    pub enabled: Vec<ChannelKind>,
    pub template_dir: Option<PathBuf>,
    pub telegram_template: String,
    pub email_template: String,
    pub webhook_template: String,
    pub send_timeout: Duration,
    pub telegram: Option<TelegramConfig>,
    pub email: Option<EmailConfig>,
    pub webhook: Option<WebhookConfig>,
}

impl ChannelsConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                | Default    |
    /// |-------------------------|------------|
    /// | `AVAILABLE_CHANNELS`    | empty      |
    /// | `TEMPLATE_DIR`          | built-ins  |
    /// | `TEMPLATE_TELEGRAM`     | `telegram` |
    /// | `TEMPLATE_EMAIL`        | `email`    |
    /// | `TEMPLATE_WEBHOOK`      | `webhook`  |
    /// | `DELIVERY_TIMEOUT_SECS` | `30`       |
    ///
    /// Per-channel variables are read by [`TelegramConfig`],
    /// [`EmailConfig`] and [`WebhookConfig`].
    pub fn from_env() -> Self {
        let (enabled, unknown) =
            parse_channel_list(&std::env::var("AVAILABLE_CHANNELS").unwrap_or_default());
        for name in unknown {
            tracing::warn!(channel = %name, "Ignoring unknown notification channel");
        }

        let template = |var: &str, kind: ChannelKind| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| kind.as_str().to_string())
        };

        Self {
            enabled,
            template_dir: std::env::var("TEMPLATE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            telegram_template: template("TEMPLATE_TELEGRAM", ChannelKind::Telegram),
            email_template: template("TEMPLATE_EMAIL", ChannelKind::Email),
            webhook_template: template("TEMPLATE_WEBHOOK", ChannelKind::Webhook),
            send_timeout: std::env::var("DELIVERY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SEND_TIMEOUT),
            telegram: TelegramConfig::from_env(),
            email: EmailConfig::from_env(),
            webhook: WebhookConfig::from_env(),
        }
    }

    fn template_for(&self, channel: ChannelKind) -> &str {
        match channel {
            ChannelKind::Telegram => &self.telegram_template,
            ChannelKind::Email => &self.email_template,
            ChannelKind::Webhook => &self.webhook_template,
        }
    }

    /// Build a sender for `channel`, or `None` (with a warning) when its
    /// credentials are missing or invalid.
    fn build_sender(&self, channel: ChannelKind) -> Option<Arc<dyn NotificationSender>> {
        let built: Result<Arc<dyn NotificationSender>, String> = match channel {
            ChannelKind::Telegram => match &self.telegram {
                Some(cfg) => TelegramDelivery::new(cfg.clone())
                    .map(|d| Arc::new(d) as Arc<dyn NotificationSender>)
                    .map_err(|e| e.to_string()),
                None => Err("TELEGRAM_BOT_TOKEN is not set".into()),
            },
            ChannelKind::Email => match &self.email {
                Some(cfg) => EmailDelivery::new(cfg.clone())
                    .map(|d| Arc::new(d) as Arc<dyn NotificationSender>)
                    .map_err(|e| e.to_string()),
                None => Err("SMTP_HOST is not set".into()),
            },
            ChannelKind::Webhook => match &self.webhook {
                Some(cfg) => WebhookDelivery::new(cfg.clone())
                    .map(|d| Arc::new(d) as Arc<dyn NotificationSender>)
                    .map_err(|e| e.to_string()),
                None => Err("WEBHOOK_URLS is not set".into()),
            },
        };

        match built {
            Ok(sender) => Some(sender),
            Err(reason) => {
                tracing::warn!(%channel, %reason, "Notification channel is not configured, skipping");
                None
            }
        }
    }

    /// Assemble the registry for every enabled, configured channel.
    ///
    /// Only template errors are fatal: they mean every delivery would fail.
    pub fn build_registry(&self) -> Result<NotificationRegistry, TemplateError> {
        let renderer = match &self.template_dir {
            Some(dir) => HandlebarsRenderer::with_template_dir(dir)?,
            None => HandlebarsRenderer::new()?,
        };

        for channel in &self.enabled {
            let name = self.template_for(*channel);
            if !renderer.has_template(name) {
                return Err(TemplateError::NotFound(name.to_string()));
            }
        }

        let mut registry =
            NotificationRegistry::new(Arc::new(renderer)).with_send_timeout(self.send_timeout);
        for &channel in &self.enabled {
            if let Some(sender) = self.build_sender(channel) {
                registry.register(sender, self.template_for(channel));
            }
        }

        tracing::info!(channels = ?registry.channels(), "Notification registry ready");
        Ok(registry)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn base_config() -> ChannelsConfig {
        ChannelsConfig {
            enabled: vec![],
            template_dir: None,
            telegram_template: "telegram".into(),
            email_template: "email".into(),
            webhook_template: "webhook".into(),
            send_timeout: Duration::from_secs(1),
            telegram: None,
            email: None,
            webhook: None,
        }
    }

    #[test]
    fn split_list_strips_quotes_and_blanks() {
        assert_eq!(split_list("\"1, 2,,3 \""), vec!["1", "2", "3"]);
        assert_eq!(split_list("'a@b.c'"), vec!["a@b.c"]);
        assert!(split_list("  ").is_empty());
    }

    #[tokio::test]
    async fn unconfigured_channels_are_skipped() {
        let mut config = base_config();
        config.enabled = vec![ChannelKind::Telegram, ChannelKind::Email, ChannelKind::Webhook];
        config.webhook = Some(WebhookConfig::new(vec!["http://127.0.0.1:9/hook".into()]));

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.channels(), vec![ChannelKind::Webhook]);
    }

    #[tokio::test]
    async fn disabled_channels_are_not_registered() {
        let mut config = base_config();
        config.webhook = Some(WebhookConfig::new(vec!["http://127.0.0.1:9/hook".into()]));
        assert!(config.build_registry().unwrap().is_empty());
    }

    #[test]
    fn unknown_template_name_is_fatal() {
        let mut config = base_config();
        config.enabled = vec![ChannelKind::Email];
        config.email_template = "fancy-email".into();
        assert_matches!(
            config.build_registry().err(),
            Some(TemplateError::NotFound(name)) if name == "fancy-email"
        );
    }
}
