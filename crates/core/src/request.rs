//! Notification send requests.
//!
//! [`SendNotificationInput`] is the untrusted wire shape. It must pass
//! [`SendNotificationInput::validate`] to become a [`NotificationRequest`],
//! which is the only shape the dispatcher accepts.

use serde::Deserialize;

use crate::channels::{parse_channel_list, Channel};
use crate::error::CoreError;
use crate::metadata::Metadata;
use crate::topics::Topic;
use crate::types::UserId;

/// Raw body of `POST /notifications/send`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationInput {
    pub user_id: String,
    pub topic: String,
    pub channels: Option<Vec<String>>,
    pub metadata: Option<serde_json::Value>,
}

/// A validated notification request.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub user_id: UserId,
    pub topic: Topic,
    /// `None` means "every channel the user has enabled".
    pub channels: Option<Vec<Channel>>,
    pub metadata: Metadata,
}

impl NotificationRequest {
    pub fn new(user_id: impl Into<String>, topic: Topic) -> Self {
        Self {
            user_id: user_id.into(),
            topic,
            channels: None,
            metadata: Metadata::default(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<Channel>) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl SendNotificationInput {
    /// Check every enum and shape constraint. Performs no I/O.
    pub fn validate(self) -> Result<NotificationRequest, CoreError> {
        if self.user_id.trim().is_empty() {
            return Err(CoreError::Validation("userId must not be blank".into()));
        }
        let topic: Topic = self.topic.parse()?;
        let channels = self
            .channels
            .as_deref()
            .map(parse_channel_list::<String>)
            .transpose()?;
        let metadata = match self.metadata {
            Some(value) => Metadata::from_json(value)?,
            None => Metadata::default(),
        };

        Ok(NotificationRequest {
            user_id: self.user_id,
            topic,
            channels,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn raw(body: serde_json::Value) -> SendNotificationInput {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn minimal_request() {
        let req = raw(json!({"userId": "u-1", "topic": "updates"}))
            .validate()
            .unwrap();
        assert_eq!(req, NotificationRequest::new("u-1", Topic::Updates));
    }

    #[test]
    fn explicit_channels_and_metadata() {
        let req = raw(json!({
            "userId": "u-1",
            "topic": "marketing",
            "channels": ["push", "email"],
            "metadata": {"campaign": "spring"}
        }))
        .validate()
        .unwrap();
        assert_eq!(req.channels, Some(vec![Channel::Push, Channel::Email]));
        assert_eq!(req.metadata.len(), 1);
    }

    #[test]
    fn unknown_topic() {
        assert_matches!(
            raw(json!({"userId": "u-1", "topic": "gossip"})).validate(),
            Err(CoreError::InvalidTopic(_))
        );
    }

    #[test]
    fn unknown_channel() {
        assert_matches!(
            raw(json!({"userId": "u-1", "topic": "updates", "channels": ["email", "fax"]}))
                .validate(),
            Err(CoreError::InvalidChannel(_))
        );
    }

    #[test]
    fn nested_metadata_is_rejected() {
        assert_matches!(
            raw(json!({"userId": "u-1", "topic": "updates", "metadata": {"a": {"b": 1}}}))
                .validate(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn blank_user_id() {
        assert_matches!(
            raw(json!({"userId": " ", "topic": "updates"})).validate(),
            Err(CoreError::Validation(_))
        );
    }
}
