//! Row model for `notification_preferences`.

use courier_core::error::CoreError;
use courier_core::preference::{ChannelFlags, PreferenceRecord, TopicFlags};
use courier_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow)]
pub struct PreferenceRow {
    pub user_id: String,
    pub email: String,
    pub phone: Option<String>,
    pub push_token: Option<String>,
    pub timezone: String,
    pub topics: Json<TopicFlags>,
    pub frequency: String,
    pub channels: Json<ChannelFlags>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PreferenceRow {
    pub fn into_record(self) -> Result<PreferenceRecord, CoreError> {
        let frequency = self.frequency.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Stored frequency '{}' for user {} is not recognised",
                self.frequency, self.user_id
            ))
        })?;

        Ok(PreferenceRecord {
            user_id: self.user_id,
            email: self.email,
            phone: self.phone,
            push_token: self.push_token,
            timezone: self.timezone,
            topics: self.topics.0,
            frequency,
            channels: self.channels.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
