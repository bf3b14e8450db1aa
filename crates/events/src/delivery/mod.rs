//! Delivery channels for rendered alert notifications.
//!
//! Every channel implements [`NotificationSender`]. A sender returns
//! `Ok(true)` when at least one recipient accepted the message, `Ok(false)`
//! when nobody did, and `Err` when the channel itself is unusable.

pub mod email;
pub mod telegram;
pub mod webhook;

use alertproxy_core::channels::ChannelKind;
use alertproxy_core::notification::Notification;
use async_trait::async_trait;

pub use email::{EmailConfig, EmailDelivery, EmailError};
pub use telegram::{TelegramConfig, TelegramDelivery, TelegramError};
pub use webhook::{WebhookConfig, WebhookDelivery, WebhookError};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("Delivery timed out after {0} s")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// NotificationSender
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// The channel this sender delivers on.
    fn channel(&self) -> ChannelKind;

    /// Deliver `notification` to every configured recipient.
    async fn send(&self, notification: &Notification) -> Result<bool, DeliveryError>;
}
