//! Row models for `dispatch_attempts` and `dispatch_channel_entries`.

use std::collections::BTreeMap;

use courier_core::channels::Channel;
use courier_core::dispatch::{ChannelResult, ChannelStatus, DispatchAttempt};
use courier_core::error::CoreError;
use courier_core::metadata::Metadata;
use courier_core::types::{AttemptId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `dispatch_attempts` table.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub user_id: String,
    pub topic: String,
    pub user_timezone: String,
    pub requested_channels: Json<Vec<Channel>>,
    pub metadata: Json<Metadata>,
    pub created_at: Timestamp,
}

/// A row from the `dispatch_channel_entries` table.
#[derive(Debug, Clone, FromRow)]
pub struct ChannelEntryRow {
    pub id: i64,
    pub attempt_id: AttemptId,
    pub channel: String,
    pub status: String,
    pub sent_at: Option<Timestamp>,
    pub failure_reason: Option<String>,
}

impl ChannelEntryRow {
    fn decode(&self) -> Result<(Channel, ChannelResult), CoreError> {
        let channel: Channel = self.channel.parse()?;
        let status: ChannelStatus = self.status.parse().map_err(CoreError::Internal)?;
        Ok((
            channel,
            ChannelResult {
                status,
                sent_at: self.sent_at,
                failure_reason: self.failure_reason.clone(),
            },
        ))
    }
}

impl AttemptRow {
    /// Fold channel entries, in insertion order, into the attempt they belong to.
    ///
    /// Later entries for the same channel replace earlier ones, so a terminal
    /// outcome supersedes the `pending` entry written when the attempt opened.
    pub fn into_attempt(self, entries: &[ChannelEntryRow]) -> Result<DispatchAttempt, CoreError> {
        let mut per_channel_results = BTreeMap::new();
        for entry in entries.iter().filter(|e| e.attempt_id == self.id) {
            let (channel, result) = entry.decode()?;
            per_channel_results.insert(channel, result);
        }

        Ok(DispatchAttempt {
            attempt_id: self.id,
            topic: self.topic.parse()?,
            user_id: self.user_id,
            user_timezone: self.user_timezone,
            requested_channels: self.requested_channels.0,
            per_channel_results,
            metadata: self.metadata.0,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use courier_core::dispatch::OverallStatus;

    use super::*;

    fn entry(id: i64, attempt_id: AttemptId, channel: &str, status: &str) -> ChannelEntryRow {
        ChannelEntryRow {
            id,
            attempt_id,
            channel: channel.into(),
            status: status.into(),
            sent_at: None,
            failure_reason: None,
        }
    }

    #[test]
    fn terminal_entry_supersedes_pending() {
        let id = uuid::Uuid::new_v4();
        let row = AttemptRow {
            id,
            user_id: "u-1".into(),
            topic: "updates".into(),
            user_timezone: "UTC".into(),
            requested_channels: Json(vec![Channel::Email, Channel::Sms]),
            metadata: Json(Metadata::default()),
            created_at: Utc::now(),
        };
        let entries = vec![
            entry(1, id, "email", "pending"),
            entry(2, id, "sms", "pending"),
            entry(3, id, "email", "sent"),
            entry(4, uuid::Uuid::new_v4(), "sms", "failed"),
        ];

        let attempt = row.into_attempt(&entries).unwrap();
        assert_eq!(
            attempt.per_channel_results[&Channel::Email].status,
            ChannelStatus::Sent
        );
        assert_eq!(
            attempt.per_channel_results[&Channel::Sms].status,
            ChannelStatus::Pending
        );
        assert_eq!(attempt.overall_status(), OverallStatus::Pending);
    }
}
