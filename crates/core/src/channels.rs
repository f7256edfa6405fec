//! Delivery channel vocabulary.
//!
//! The string forms must match the keys accepted by the preference API, the
//! `channel` column of `dispatch_channel_entries`, and the keys of the
//! `channels` JSONB object stored on each preference row.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Email delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// SMS delivered via an HTTP gateway.
pub const CHANNEL_SMS: &str = "sms";

/// Mobile push delivered via an HTTP gateway.
pub const CHANNEL_PUSH: &str = "push";

/// A delivery medium.
///
/// Variant order is the canonical channel order used whenever the caller
/// does not specify one (e.g. "all enabled channels").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Push,
}

impl Channel {
    /// Every channel, in canonical order.
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Push];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => CHANNEL_EMAIL,
            Channel::Sms => CHANNEL_SMS,
            Channel::Push => CHANNEL_PUSH,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CHANNEL_EMAIL => Ok(Channel::Email),
            CHANNEL_SMS => Ok(Channel::Sms),
            CHANNEL_PUSH => Ok(Channel::Push),
            other => Err(CoreError::InvalidChannel(other.to_string())),
        }
    }
}

/// Parse a caller-supplied channel list.
///
/// Duplicates are dropped while preserving first-seen order. Any unknown
/// name fails the whole list.
pub fn parse_channel_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Channel>, CoreError> {
    let parsed = names
        .iter()
        .map(|name| name.as_ref().parse())
        .collect::<Result<Vec<Channel>, CoreError>>()?;
    Ok(dedupe_channels(parsed))
}

/// Drop repeated channels, keeping first-seen order.
pub fn dedupe_channels(channels: impl IntoIterator<Item = Channel>) -> Vec<Channel> {
    let mut out: Vec<Channel> = Vec::new();
    for channel in channels {
        if !out.contains(&channel) {
            out.push(channel);
        }
    }
    out
}
