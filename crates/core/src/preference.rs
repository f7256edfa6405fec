//! Per-user preference records and the validated create/patch inputs.
//!
//! Raw request bodies arrive as [`PreferenceInput`] / [`PreferencePatchInput`]
//! with string-keyed topic and channel maps. They are converted into
//! [`NewPreference`] / [`PreferencePatch`] before any store is touched, so
//! unknown topic or channel names never reach persistence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::channels::Channel;
use crate::error::CoreError;
use crate::topics::{Frequency, Topic};
use crate::types::{Timestamp, UserId};

/// Timezone stored when the caller does not supply one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

// ---------------------------------------------------------------------------
// Flag sets
// ---------------------------------------------------------------------------

/// Per-topic opt-in flags. Serialized as `{ "marketing": bool, ... }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFlags {
    pub marketing: bool,
    pub newsletter: bool,
    pub updates: bool,
}

impl TopicFlags {
    pub fn get(&self, topic: Topic) -> bool {
        match topic {
            Topic::Marketing => self.marketing,
            Topic::Newsletter => self.newsletter,
            Topic::Updates => self.updates,
        }
    }

    pub fn set(&mut self, topic: Topic, enabled: bool) {
        match topic {
            Topic::Marketing => self.marketing = enabled,
            Topic::Newsletter => self.newsletter = enabled,
            Topic::Updates => self.updates = enabled,
        }
    }
}

impl Default for TopicFlags {
    fn default() -> Self {
        Self {
            marketing: false,
            newsletter: true,
            updates: true,
        }
    }
}

/// Per-channel enabled flags. Serialized as `{ "email": bool, ... }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFlags {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

impl ChannelFlags {
    pub fn get(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::Push => self.push,
        }
    }

    pub fn set(&mut self, channel: Channel, enabled: bool) {
        match channel {
            Channel::Email => self.email = enabled,
            Channel::Sms => self.sms = enabled,
            Channel::Push => self.push = enabled,
        }
    }

    /// Enabled channels in canonical order.
    pub fn enabled(&self) -> Vec<Channel> {
        Channel::ALL.into_iter().filter(|c| self.get(*c)).collect()
    }
}

impl Default for ChannelFlags {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            push: false,
        }
    }
}

// ---------------------------------------------------------------------------
// PreferenceRecord
// ---------------------------------------------------------------------------

/// One user's notification preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    pub user_id: UserId,
    pub email: String,
    pub phone: Option<String>,
    pub push_token: Option<String>,
    pub timezone: String,
    pub topics: TopicFlags,
    pub frequency: Frequency,
    pub channels: ChannelFlags,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PreferenceRecord {
    /// Build a fresh record from validated input, stamped with `now`.
    pub fn from_new(new: NewPreference, now: Timestamp) -> Self {
        Self {
            user_id: new.user_id,
            email: new.email,
            phone: new.phone,
            push_token: new.push_token,
            timezone: new.timezone,
            topics: new.topics,
            frequency: new.frequency,
            channels: new.channels,
            created_at: now,
            updated_at: now,
        }
    }

    /// The address a sender for `channel` should deliver to, if any.
    ///
    /// Push falls back to the user id, which push gateways accept as an
    /// external user reference.
    pub fn address_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Email => Some(self.email.as_str()),
            Channel::Sms => self.phone.as_deref(),
            Channel::Push => Some(self.push_token.as_deref().unwrap_or(&self.user_id)),
        }
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Raw body of a preference creation request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceInput {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 512))]
    pub push_token: Option<String>,
    pub timezone: Option<String>,
    pub topics: Option<BTreeMap<String, bool>>,
    pub frequency: Option<String>,
    pub channels: Option<BTreeMap<String, bool>>,
}

/// A validated preference ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPreference {
    pub user_id: UserId,
    pub email: String,
    pub phone: Option<String>,
    pub push_token: Option<String>,
    pub timezone: String,
    pub topics: TopicFlags,
    pub frequency: Frequency,
    pub channels: ChannelFlags,
}

impl NewPreference {
    /// Minimal preference with defaults for everything but the identity.
    pub fn with_defaults(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            phone: None,
            push_token: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            topics: TopicFlags::default(),
            frequency: Frequency::default(),
            channels: ChannelFlags::default(),
        }
    }
}

impl PreferenceInput {
    /// Validate field shapes and enum names, filling defaults for omitted fields.
    pub fn into_new_preference(self) -> Result<NewPreference, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if self.user_id.trim().is_empty() {
            return Err(CoreError::Validation("userId must not be blank".into()));
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }

        let timezone = match self.timezone {
            Some(tz) => validate_timezone(tz)?,
            None => DEFAULT_TIMEZONE.to_string(),
        };

        let mut topics = TopicFlags::default();
        if let Some(map) = &self.topics {
            for (topic, enabled) in parse_topic_map(map)? {
                topics.set(topic, enabled);
            }
        }

        let mut channels = ChannelFlags::default();
        if let Some(map) = &self.channels {
            for (channel, enabled) in parse_channel_map(map)? {
                channels.set(channel, enabled);
            }
        }

        let frequency = match self.frequency.as_deref() {
            Some(f) => f.parse()?,
            None => Frequency::default(),
        };

        Ok(NewPreference {
            user_id: self.user_id,
            email: self.email,
            phone: self.phone,
            push_token: self.push_token,
            timezone,
            topics,
            frequency,
            channels,
        })
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Raw body of a partial preference update. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreferencePatchInput {
    /// Only accepted when it matches the record being updated.
    pub user_id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 512))]
    pub push_token: Option<String>,
    pub timezone: Option<String>,
    pub topics: Option<BTreeMap<String, bool>>,
    pub frequency: Option<String>,
    pub channels: Option<BTreeMap<String, bool>>,
}

/// A validated partial update. Absent fields are left untouched, including
/// individual topic and channel flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencePatch {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub push_token: Option<String>,
    pub timezone: Option<String>,
    pub topics: BTreeMap<Topic, bool>,
    pub frequency: Option<Frequency>,
    pub channels: BTreeMap<Channel, bool>,
}

impl PreferencePatchInput {
    /// Validate the patch against the record it targets.
    pub fn into_patch(self, user_id: &str) -> Result<PreferencePatch, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if let Some(body_user_id) = &self.user_id {
            if body_user_id != user_id {
                return Err(CoreError::Validation("userId is immutable".into()));
            }
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }

        let timezone = self.timezone.map(validate_timezone).transpose()?;
        let topics = match &self.topics {
            Some(map) => parse_topic_map(map)?,
            None => BTreeMap::new(),
        };
        let channels = match &self.channels {
            Some(map) => parse_channel_map(map)?,
            None => BTreeMap::new(),
        };
        let frequency = self
            .frequency
            .as_deref()
            .map(str::parse::<Frequency>)
            .transpose()?;

        Ok(PreferencePatch {
            email: self.email,
            phone: self.phone,
            push_token: self.push_token,
            timezone,
            topics,
            frequency,
            channels,
        })
    }
}

impl PreferencePatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.push_token.is_none()
            && self.timezone.is_none()
            && self.topics.is_empty()
            && self.frequency.is_none()
            && self.channels.is_empty()
    }

    /// Overlay the patch onto `record`. Does not touch timestamps.
    pub fn apply(&self, record: &mut PreferenceRecord) {
        if let Some(email) = &self.email {
            record.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            record.phone = Some(phone.clone());
        }
        if let Some(token) = &self.push_token {
            record.push_token = Some(token.clone());
        }
        if let Some(tz) = &self.timezone {
            record.timezone = tz.clone();
        }
        for (topic, enabled) in &self.topics {
            record.topics.set(*topic, *enabled);
        }
        if let Some(frequency) = self.frequency {
            record.frequency = frequency;
        }
        for (channel, enabled) in &self.channels {
            record.channels.set(*channel, *enabled);
        }
    }
}

// ---------------------------------------------------------------------------
// Field validation helpers
// ---------------------------------------------------------------------------

fn parse_topic_map(map: &BTreeMap<String, bool>) -> Result<BTreeMap<Topic, bool>, CoreError> {
    map.iter()
        .map(|(name, enabled)| Ok((name.parse::<Topic>()?, *enabled)))
        .collect()
}

fn parse_channel_map(map: &BTreeMap<String, bool>) -> Result<BTreeMap<Channel, bool>, CoreError> {
    map.iter()
        .map(|(name, enabled)| Ok((name.parse::<Channel>()?, *enabled)))
        .collect()
}

fn validate_timezone(tz: String) -> Result<String, CoreError> {
    if tz.parse::<chrono_tz::Tz>().is_err() {
        return Err(CoreError::Validation(format!("Unknown IANA timezone: {tz}")));
    }
    Ok(tz)
}

/// Accepts an optional leading `+` followed by 6-15 digits.
fn validate_phone(phone: &str) -> Result<(), CoreError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let ok = (6..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if !ok {
        return Err(CoreError::Validation(format!("Invalid phone number: {phone}")));
    }
    Ok(())
}
