//! Telegram chat-bot delivery.
//!
//! [`TelegramDelivery`] posts one `sendMessage` call per configured chat id.
//! The message text is the notification title, a blank line and the body,
//! truncated to the configured character budget. In `HTML` parse mode the
//! cut never splits a tag or an entity and every tag left open is closed.

use std::time::Duration;

use alertproxy_core::channels::ChannelKind;
use alertproxy_core::notification::Notification;
use async_trait::async_trait;
use serde::Serialize;

use super::{DeliveryError, NotificationSender};
use crate::config::split_list;

/// Default Bot API base URL.
const DEFAULT_API_URL: &str = "https://api.telegram.org";

const DEFAULT_PARSE_MODE: &str = "HTML";

/// Telegram rejects messages above 4096 characters; leave room for markup.
const DEFAULT_MAX_CHARS: usize = 3500;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const TRUNCATION_MARKER: &str = "...";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Telegram returned HTTP {status}: {body}")]
    ApiError { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// TelegramConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_ids: Vec<String>,
    pub parse_mode: String,
    pub max_chars: usize,
    /// Bot API base URL without trailing slash.
    pub api_url: String,
}

impl TelegramConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `TELEGRAM_BOT_TOKEN` is not set.
    ///
    /// | Variable              | Required | Default                    |
    /// |-----------------------|----------|----------------------------|
    /// | `TELEGRAM_BOT_TOKEN`  | yes      |                            |
    /// | `RECEIVERS_TG_IDS`    | no       | empty                      |
    /// | `TELEGRAM_PARSE_MODE` | no       | `HTML`                     |
    /// | `TELEGRAM_MAX_CHARS`  | no       | `3500`                     |
    /// | `TELEGRAM_API_URL`    | no       | `https://api.telegram.org` |
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())?;
        Some(Self {
            bot_token,
            chat_ids: split_list(&std::env::var("RECEIVERS_TG_IDS").unwrap_or_default()),
            parse_mode: std::env::var("TELEGRAM_PARSE_MODE")
                .unwrap_or_else(|_| DEFAULT_PARSE_MODE.to_string()),
            max_chars: std::env::var("TELEGRAM_MAX_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CHARS),
            api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// TelegramDelivery
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
    parse_mode: &'a str,
}

pub struct TelegramDelivery {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramDelivery {
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn format_text(&self, notification: &Notification) -> String {
        let lines = [notification.title.as_str(), "", notification.body.as_str()];
        if self.config.parse_mode.eq_ignore_ascii_case("HTML") {
            truncate_html(&lines.join("\n"), self.config.max_chars)
        } else {
            safe_join_lines(lines, self.config.max_chars)
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.config.api_url, self.config.bot_token)
    }

    async fn send_to(&self, url: &str, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        let body = SendMessage {
            chat_id,
            text,
            disable_web_page_preview: true,
            parse_mode: &self.config.parse_mode,
        };
        // The URL embeds the bot token; keep it out of error messages.
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelegramError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for TelegramDelivery {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send(&self, notification: &Notification) -> Result<bool, DeliveryError> {
        if self.config.chat_ids.is_empty() {
            tracing::warn!("Telegram channel has no recipients");
            return Ok(false);
        }

        let text = self.format_text(notification);
        let url = self.send_message_url();

        let mut success = 0usize;
        let mut failed = 0usize;
        for chat_id in &self.config.chat_ids {
            match self.send_to(&url, chat_id, &text).await {
                Ok(()) => {
                    tracing::info!(chat_id = %chat_id, "Telegram message sent");
                    success += 1;
                }
                Err(e) => {
                    tracing::error!(chat_id = %chat_id, error = %e, "Telegram delivery failed");
                    failed += 1;
                }
            }
        }

        tracing::info!(
            total = self.config.chat_ids.len(),
            success,
            failed,
            "Telegram fan-out finished"
        );
        Ok(success > 0)
    }
}

/// Join `lines` with newlines and cut the result to `max_chars` characters,
/// ending with `...` when anything was dropped.
pub fn safe_join_lines<'a>(lines: impl IntoIterator<Item = &'a str>, max_chars: usize) -> String {
    let joined = lines.into_iter().collect::<Vec<_>>().join("\n");
    if joined.chars().count() <= max_chars {
        return joined;
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let mut out: String = joined.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

// ---------------------------------------------------------------------------
// HTML truncation
// ---------------------------------------------------------------------------

enum Markup<'a> {
    Open(&'a str),
    Close(&'a str),
    Text,
}

/// Split the next tag, entity or character off `s`. `None` at the end of
/// input or at a `<` that is never closed.
fn next_token(s: &str) -> Option<(&str, Markup<'_>)> {
    let first = s.chars().next()?;
    match first {
        '<' => {
            let end = s.find('>')?;
            let raw = &s[..=end];
            let inner = raw[1..end].trim();
            match inner.strip_prefix('/') {
                Some(tag) => Some((raw, Markup::Close(tag_name(tag)))),
                None => Some((raw, Markup::Open(tag_name(inner)))),
            }
        }
        '&' => {
            let body = s[1..]
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'#')
                .count();
            let len = if body > 0 && s.as_bytes().get(1 + body) == Some(&b';') {
                body + 2
            } else {
                1
            };
            Some((&s[..len], Markup::Text))
        }
        _ => Some((&s[..first.len_utf8()], Markup::Text)),
    }
}

fn tag_name(tag: &str) -> &str {
    tag.split_whitespace().next().unwrap_or_default()
}

/// Cut Telegram HTML to at most `max_chars` characters, counting the
/// `...` marker and the closing tags appended for anything left open.
pub fn truncate_html(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker = TRUNCATION_MARKER.chars().count();
    let mut out = String::new();
    let mut open: Vec<&str> = Vec::new();
    // Characters needed to close everything in `open`.
    let mut closing = 0usize;
    let mut used = 0usize;
    let mut rest = text;

    while let Some((raw, markup)) = next_token(rest) {
        let closing_after = match &markup {
            Markup::Open(name) => closing + name.chars().count() + 3,
            Markup::Close(name) if open.last() == Some(name) => {
                closing - (name.chars().count() + 3)
            }
            _ => closing,
        };
        let width = raw.chars().count();
        if used + width + closing_after + marker > max_chars {
            break;
        }

        match markup {
            Markup::Open(name) => open.push(name),
            Markup::Close(name) if open.last() == Some(&name) => {
                open.pop();
            }
            _ => {}
        }
        out.push_str(raw);
        used += width;
        closing = closing_after;
        rest = &rest[raw.len()..];
    }

    out.push_str(TRUNCATION_MARKER);
    for name in open.iter().rev() {
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
