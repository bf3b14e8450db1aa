//! The fixed set of notification delivery channels.
//!
//! Channel names are the values accepted in `AVAILABLE_CHANNELS` and the
//! keys of a [`DeliveryReport`](crate::notification::DeliveryReport).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Telegram chat bot.
pub const CHANNEL_TELEGRAM: &str = "telegram";

/// Email delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// JSON POST to external HTTP endpoints.
pub const CHANNEL_WEBHOOK: &str = "webhook";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Telegram,
    Email,
    Webhook,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Telegram, ChannelKind::Email, ChannelKind::Webhook];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Telegram => CHANNEL_TELEGRAM,
            ChannelKind::Email => CHANNEL_EMAIL,
            ChannelKind::Webhook => CHANNEL_WEBHOOK,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        ChannelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown channel: {s:?}")))
    }
}

/// Parse a comma-separated channel list, stripping surrounding quotes.
///
/// Unknown names are returned separately so the caller can log and ignore
/// them. Duplicates are collapsed, first occurrence wins.
pub fn parse_channel_list(raw: &str) -> (Vec<ChannelKind>, Vec<String>) {
    let cleaned = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let mut known = Vec::new();
    let mut unknown = Vec::new();

    for name in cleaned.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name.parse::<ChannelKind>() {
            Ok(kind) if !known.contains(&kind) => known.push(kind),
            Ok(_) => {}
            Err(_) => unknown.push(name.to_string()),
        }
    }

    (known, unknown)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
