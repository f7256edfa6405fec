//! Dispatch attempt model and outcome aggregation.
//!
//! A [`DispatchAttempt`] is one logical notification send. It carries one
//! [`ChannelResult`] per channel that was actually attempted; the overall
//! outcome is never stored and is always recomputed from those results by
//! [`aggregate`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::channels::Channel;
use crate::metadata::Metadata;
use crate::topics::Topic;
use crate::types::{AttemptId, Timestamp, UserId};

/// Failure reason recorded when a sender does not settle in time.
pub const TIMEOUT_REASON: &str = "Timeout";

// ---------------------------------------------------------------------------
// Per-channel result
// ---------------------------------------------------------------------------

/// Status of a single channel within an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Pending,
    Sent,
    Failed,
}

impl ChannelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelStatus::Pending => "pending",
            ChannelStatus::Sent => "sent",
            ChannelStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ChannelStatus::Pending)
    }
}

impl std::str::FromStr for ChannelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChannelStatus::Pending),
            "sent" => Ok(ChannelStatus::Sent),
            "failed" => Ok(ChannelStatus::Failed),
            other => Err(format!("unknown channel status '{other}'")),
        }
    }
}

/// Outcome of one channel within an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResult {
    pub status: ChannelStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ChannelResult {
    pub fn pending() -> Self {
        Self {
            status: ChannelStatus::Pending,
            sent_at: None,
            failure_reason: None,
        }
    }

    pub fn sent(at: Timestamp) -> Self {
        Self {
            status: ChannelStatus::Sent,
            sent_at: Some(at),
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: ChannelStatus::Failed,
            sent_at: None,
            failure_reason: Some(reason.into()),
        }
    }

    pub fn timed_out() -> Self {
        Self::failed(TIMEOUT_REASON)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Aggregate outcome of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    /// Every attempted channel succeeded.
    AllSent,
    /// At least one channel succeeded and at least one failed.
    PartialFailure,
    /// Every attempted channel failed.
    AllFailed,
    /// No channel was eligible; nothing was attempted.
    Suppressed,
    /// At least one channel has not settled yet.
    Pending,
}

/// Derive the overall status from per-channel results.
pub fn aggregate<'a, I>(results: I) -> OverallStatus
where
    I: IntoIterator<Item = &'a ChannelResult>,
{
    let (mut sent, mut failed, mut pending) = (0usize, 0usize, 0usize);
    for result in results {
        match result.status {
            ChannelStatus::Sent => sent += 1,
            ChannelStatus::Failed => failed += 1,
            ChannelStatus::Pending => pending += 1,
        }
    }

    match (sent, failed, pending) {
        (0, 0, 0) => OverallStatus::Suppressed,
        (_, _, p) if p > 0 => OverallStatus::Pending,
        (_, 0, _) => OverallStatus::AllSent,
        (0, _, _) => OverallStatus::AllFailed,
        _ => OverallStatus::PartialFailure,
    }
}

// ---------------------------------------------------------------------------
// DispatchAttempt
// ---------------------------------------------------------------------------

/// One logical notification send spanning zero or more channels.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchAttempt {
    pub attempt_id: AttemptId,
    pub user_id: UserId,
    pub topic: Topic,
    /// The user's timezone at dispatch time. Annotation only.
    pub user_timezone: String,
    /// Channels the caller asked for, or every enabled channel when unspecified.
    pub requested_channels: Vec<Channel>,
    pub per_channel_results: BTreeMap<Channel, ChannelResult>,
    pub metadata: Metadata,
    pub created_at: Timestamp,
}

impl DispatchAttempt {
    /// Open a new attempt with every `eligible` channel pending.
    pub fn open(
        user_id: impl Into<String>,
        topic: Topic,
        user_timezone: impl Into<String>,
        requested_channels: Vec<Channel>,
        eligible: &[Channel],
        metadata: Metadata,
        now: Timestamp,
    ) -> Self {
        Self {
            attempt_id: uuid::Uuid::new_v4(),
            user_id: user_id.into(),
            topic,
            user_timezone: user_timezone.into(),
            requested_channels,
            per_channel_results: eligible
                .iter()
                .map(|c| (*c, ChannelResult::pending()))
                .collect(),
            metadata,
            created_at: now,
        }
    }

    pub fn overall_status(&self) -> OverallStatus {
        aggregate(self.per_channel_results.values())
    }

    /// True once no channel is pending. A zero-channel attempt is terminal.
    pub fn is_terminal(&self) -> bool {
        self.per_channel_results
            .values()
            .all(|r| r.status.is_terminal())
    }
}

/// Wire form of an attempt; includes the derived `overallStatus`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttemptSummary<'a> {
    attempt_id: &'a AttemptId,
    user_id: &'a str,
    topic: Topic,
    user_timezone: &'a str,
    requested_channels: &'a [Channel],
    per_channel_results: &'a BTreeMap<Channel, ChannelResult>,
    overall_status: OverallStatus,
    metadata: &'a Metadata,
    created_at: &'a Timestamp,
}

impl Serialize for DispatchAttempt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AttemptSummary {
            attempt_id: &self.attempt_id,
            user_id: &self.user_id,
            topic: self.topic,
            user_timezone: &self.user_timezone,
            requested_channels: &self.requested_channels,
            per_channel_results: &self.per_channel_results,
            overall_status: self.overall_status(),
            metadata: &self.metadata,
            created_at: &self.created_at,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn attempt_with(results: &[(Channel, ChannelResult)]) -> DispatchAttempt {
        let channels: Vec<Channel> = results.iter().map(|(c, _)| *c).collect();
        let mut attempt = DispatchAttempt::open(
            "u-1",
            Topic::Updates,
            "UTC",
            channels.clone(),
            &channels,
            Metadata::default(),
            Utc::now(),
        );
        for (channel, result) in results {
            attempt.per_channel_results.insert(*channel, result.clone());
        }
        attempt
    }

    #[test]
    fn empty_is_suppressed() {
        assert_eq!(aggregate(std::iter::empty::<&ChannelResult>()), OverallStatus::Suppressed);
    }

    #[test]
    fn all_sent() {
        let a = attempt_with(&[
            (Channel::Email, ChannelResult::sent(Utc::now())),
            (Channel::Push, ChannelResult::sent(Utc::now())),
        ]);
        assert_eq!(a.overall_status(), OverallStatus::AllSent);
    }

    #[test]
    fn mixed_is_partial_failure() {
        let a = attempt_with(&[
            (Channel::Email, ChannelResult::sent(Utc::now())),
            (Channel::Sms, ChannelResult::failed("gateway down")),
        ]);
        assert_eq!(a.overall_status(), OverallStatus::PartialFailure);
    }

    #[test]
    fn all_failed() {
        let a = attempt_with(&[
            (Channel::Email, ChannelResult::failed("bounce")),
            (Channel::Sms, ChannelResult::timed_out()),
        ]);
        assert_eq!(a.overall_status(), OverallStatus::AllFailed);
    }

    #[test]
    fn single_failure_is_all_failed_not_partial() {
        let a = attempt_with(&[(Channel::Sms, ChannelResult::failed("x"))]);
        assert_eq!(a.overall_status(), OverallStatus::AllFailed);
    }

    #[test]
    fn unsettled_channel_is_pending() {
        let a = attempt_with(&[
            (Channel::Email, ChannelResult::sent(Utc::now())),
            (Channel::Sms, ChannelResult::pending()),
        ]);
        assert_eq!(a.overall_status(), OverallStatus::Pending);
        assert!(!a.is_terminal());
    }

    #[test]
    fn open_marks_eligible_channels_pending() {
        let a = DispatchAttempt::open(
            "u-1",
            Topic::Newsletter,
            "UTC",
            vec![],
            &[Channel::Email, Channel::Push],
            Metadata::default(),
            Utc::now(),
        );
        assert_eq!(a.per_channel_results.len(), 2);
        assert!(a
            .per_channel_results
            .values()
            .all(|r| r.status == ChannelStatus::Pending));
    }

    #[test]
    fn zero_channel_attempt_is_terminal_and_suppressed() {
        let a = attempt_with(&[]);
        assert!(a.is_terminal());
        assert_eq!(a.overall_status(), OverallStatus::Suppressed);
    }

    #[test]
    fn summary_includes_derived_status() {
        let a = attempt_with(&[
            (Channel::Email, ChannelResult::sent(Utc::now())),
            (Channel::Sms, ChannelResult::failed("no route")),
        ]);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["overallStatus"], "PartialFailure");
        assert_eq!(json["perChannelResults"]["email"]["status"], "sent");
        assert_eq!(json["perChannelResults"]["sms"]["failureReason"], "no route");
        assert!(json["perChannelResults"]["sms"].get("sentAt").is_none());
    }
}
