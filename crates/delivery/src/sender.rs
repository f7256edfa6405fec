//! The channel sender capability and its registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::channels::Channel;
use courier_core::metadata::Metadata;
use courier_core::topics::Topic;

use crate::email::{EmailConfig, EmailSender};
use crate::gateway::{GatewayConfig, GatewaySender};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why a single channel delivery failed.
///
/// Never propagated past the dispatcher; its display string becomes the
/// channel's `failureReason`.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The HTTP request to a gateway failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status code.
    #[error("Gateway returned HTTP {0}")]
    HttpStatus(u16),

    /// The provider refused the message for a provider-specific reason.
    #[error("Rejected: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Delivers a notification over one channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel this sender serves.
    fn channel(&self) -> Channel;

    /// Deliver `topic` with `metadata` to `address`.
    ///
    /// `address` is the email address, phone number or push token taken
    /// from the recipient's preference record.
    async fn send(&self, address: &str, topic: Topic, metadata: &Metadata)
        -> Result<(), SendError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Senders keyed by the channel they serve. At most one per channel.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sender`, replacing any sender already serving its channel.
    pub fn register(&mut self, sender: Arc<dyn ChannelSender>) {
        self.senders.insert(sender.channel(), sender);
    }

    /// Builder form of [`SenderRegistry::register`].
    pub fn with(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.register(sender);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn ChannelSender>> {
        self.senders.get(&channel)
    }

    /// Registered channels in canonical order.
    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.senders.contains_key(c))
            .collect()
    }

    /// Build the shipped senders for every channel configured in the
    /// environment. Unconfigured channels are left without a sender.
    pub fn from_env() -> Result<Self, SendError> {
        let mut registry = Self::new();

        match EmailConfig::from_env() {
            Some(config) => registry.register(Arc::new(EmailSender::new(config))),
            None => tracing::warn!("SMTP_HOST not set, email channel disabled"),
        }
        for channel in [Channel::Sms, Channel::Push] {
            match GatewayConfig::from_env(channel) {
                Some(config) => registry.register(Arc::new(GatewaySender::new(channel, config)?)),
                None => tracing::warn!(%channel, "Gateway URL not set, channel disabled"),
            }
        }

        tracing::info!(channels = ?registry.channels(), "Channel senders configured");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(Channel);

    #[async_trait]
    impl ChannelSender for Noop {
        fn channel(&self) -> Channel {
            self.0
        }

        async fn send(&self, _: &str, _: Topic, _: &Metadata) -> Result<(), SendError> {
            Ok(())
        }
    }

    #[test]
    fn registry_keys_by_channel() {
        let registry = SenderRegistry::new()
            .with(Arc::new(Noop(Channel::Push)))
            .with(Arc::new(Noop(Channel::Email)));

        assert_eq!(registry.channels(), vec![Channel::Email, Channel::Push]);
        assert!(registry.get(Channel::Sms).is_none());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut registry = SenderRegistry::new();
        registry.register(Arc::new(Noop(Channel::Sms)));
        registry.register(Arc::new(Noop(Channel::Sms)));
        assert_eq!(registry.channels(), vec![Channel::Sms]);
    }

    #[test]
    fn send_error_display() {
        assert_eq!(SendError::HttpStatus(502).to_string(), "Gateway returned HTTP 502");
        assert_eq!(
            SendError::Rejected("opted out at carrier".into()).to_string(),
            "Rejected: opted out at carrier"
        );
    }
}
