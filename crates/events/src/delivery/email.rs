//! Email notification delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport. One message is
//! sent to all recipients at once: `Subject` is the notification title and
//! the plain-text body is the rendered template. If `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and no mailer is constructed.

use std::time::Duration;

use alertproxy_core::channels::ChannelKind;
use alertproxy_core::notification::Notification;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::extension::ClientId;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryError, NotificationSender};
use crate::config::split_list;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    #[error("No sender address: set SMTP_FROM or SMTP_USER")]
    MissingSender,
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address. Falls back to `smtp_user`.
    pub from_address: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Name announced in EHLO. Defaults to the local hostname.
    pub helo: Option<String>,
    pub timeout: Duration,
    pub recipients: Vec<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable            | Required | Default     |
    /// |---------------------|----------|-------------|
    /// | `SMTP_HOST`         | yes      |             |
    /// | `SMTP_PORT`         | no       | `587`       |
    /// | `SMTP_FROM`         | no       | `SMTP_USER` |
    /// | `SMTP_USER`         | no       |             |
    /// | `SMTP_PASSWORD`     | no       |             |
    /// | `SMTP_HELO`         | no       | hostname    |
    /// | `SMTP_TIMEOUT_SECS` | no       | `20`        |
    /// | `RECEIVERS_EMAILS`  | no       | empty       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())?;
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: non_empty("SMTP_FROM"),
            smtp_user: non_empty("SMTP_USER"),
            smtp_password: non_empty("SMTP_PASSWORD"),
            helo: non_empty("SMTP_HELO"),
            timeout: Duration::from_secs(
                std::env::var("SMTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SMTP_TIMEOUT_SECS),
            ),
            recipients: split_list(&std::env::var("RECEIVERS_EMAILS").unwrap_or_default()),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends alert notification emails via SMTP.
pub struct EmailDelivery {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl EmailDelivery {
    /// Parse addresses and build the transport once. Bad addresses are a
    /// configuration error and fail here rather than on every alert.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let from: Mailbox = config
            .from_address
            .as_deref()
            .or(config.smtp_user.as_deref())
            .ok_or(EmailError::MissingSender)?
            .parse()?;

        let recipients = config
            .recipients
            .iter()
            .map(|r| r.parse::<Mailbox>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .timeout(Some(config.timeout));

        if let Some(helo) = &config.helo {
            builder = builder.hello_name(ClientId::Domain(helo.clone()));
        }
        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
            recipients,
        })
    }

    /// Assemble the message for `notification`. `None` when there is nobody
    /// to send to.
    fn build_message(&self, notification: &Notification) -> Result<Option<Message>, EmailError> {
        if self.recipients.is_empty() {
            return Ok(None);
        }
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notification.title.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        builder
            .body(notification.body.clone())
            .map(Some)
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

#[async_trait]
impl NotificationSender for EmailDelivery {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, notification: &Notification) -> Result<bool, DeliveryError> {
        let Some(message) = self.build_message(notification)? else {
            tracing::warn!("Email channel has no recipients");
            return Ok(false);
        };

        self.mailer.send(message).await.map_err(EmailError::from)?;

        tracing::info!(
            recipients = self.recipients.len(),
            title = %notification.title,
            "Notification email sent"
        );
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn config(recipients: &[&str]) -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            from_address: Some("Alerts <alerts@example.com>".into()),
            smtp_user: Some("robot@example.com".into()),
            smtp_password: Some("secret".into()),
            helo: Some("alertproxy.example.com".into()),
            timeout: Duration::from_secs(1),
            recipients: recipients.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn notification() -> Notification {
        Notification {
            title: "[FIRING] DiskFull".into(),
            body: "Alert: DiskFull".into(),
        }
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[tokio::test]
    async fn invalid_recipient_fails_construction() {
        assert_matches!(
            EmailDelivery::new(config(&["ops@example.com", "not-an-email"])).err(),
            Some(EmailError::Address(_))
        );
    }

    #[tokio::test]
    async fn sender_falls_back_to_smtp_user() {
        let mut cfg = config(&["ops@example.com"]);
        cfg.from_address = None;
        let delivery = EmailDelivery::new(cfg).unwrap();
        assert_eq!(delivery.from.email.to_string(), "robot@example.com");

        let mut cfg = config(&[]);
        cfg.from_address = None;
        cfg.smtp_user = None;
        assert_matches!(EmailDelivery::new(cfg).err(), Some(EmailError::MissingSender));
    }

    #[tokio::test]
    async fn message_addresses_all_recipients() {
        let delivery = EmailDelivery::new(config(&["ops@example.com", "dev@example.com"])).unwrap();
        let message = delivery.build_message(&notification()).unwrap().unwrap();

        let to: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(to, vec!["ops@example.com", "dev@example.com"]);

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: [FIRING] DiskFull"));
        assert!(raw.contains("Alert: DiskFull"));
    }

    #[tokio::test]
    async fn no_recipients_reports_false() {
        let delivery = EmailDelivery::new(config(&[])).unwrap();
        assert!(!delivery.send(&notification()).await.unwrap());
    }
}
