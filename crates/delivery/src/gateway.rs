//! SMS and push delivery through HTTP gateways.
//!
//! [`GatewaySender`] POSTs a JSON payload to a provider endpoint with an
//! optional bearer token. One instance serves one channel; the payload
//! shape depends on which.

use std::time::Duration;

use async_trait::async_trait;
use courier_core::channels::Channel;
use courier_core::metadata::Metadata;
use courier_core::topics::Topic;
use serde_json::json;

use crate::message::render;
use crate::sender::{ChannelSender, SendError};

/// HTTP request timeout for a single gateway call. The dispatcher applies
/// its own, usually shorter, per-channel timeout on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Endpoint and credentials for one gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub token: Option<String>,
}

impl GatewayConfig {
    /// Load the gateway for `channel` from the environment.
    ///
    /// Reads `SMS_GATEWAY_URL` / `SMS_GATEWAY_TOKEN` or
    /// `PUSH_GATEWAY_URL` / `PUSH_GATEWAY_TOKEN`. Returns `None` when the
    /// URL is unset or when `channel` is not gateway-backed.
    pub fn from_env(channel: Channel) -> Option<Self> {
        let prefix = match channel {
            Channel::Sms => "SMS",
            Channel::Push => "PUSH",
            Channel::Email => return None,
        };
        let url = std::env::var(format!("{prefix}_GATEWAY_URL")).ok()?;
        Some(Self {
            url,
            token: std::env::var(format!("{prefix}_GATEWAY_TOKEN")).ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// GatewaySender
// ---------------------------------------------------------------------------

/// Delivers SMS or push notifications to an HTTP gateway.
pub struct GatewaySender {
    channel: Channel,
    config: GatewayConfig,
    client: reqwest::Client,
}

impl GatewaySender {
    pub fn new(channel: Channel, config: GatewayConfig) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            channel,
            config,
            client,
        })
    }

    /// JSON body sent to the gateway.
    pub fn payload(&self, address: &str, topic: Topic, metadata: &Metadata) -> serde_json::Value {
        let rendered = render(topic, metadata);
        match self.channel {
            Channel::Push => json!({
                "token": address,
                "title": rendered.title,
                "body": rendered.body,
                "data": metadata,
                "topic": topic,
            }),
            _ => {
                let text = format!("{}\n{}", rendered.title, rendered.body);
                json!({
                    "to": address,
                    "message": text.trim_end(),
                    "topic": topic,
                })
            }
        }
    }
}

#[async_trait]
impl ChannelSender for GatewaySender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        address: &str,
        topic: Topic,
        metadata: &Metadata,
    ) -> Result<(), SendError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .json(&self.payload(address, topic, metadata));
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SendError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(channel = %self.channel, %topic, "Gateway accepted notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sender(channel: Channel) -> GatewaySender {
        GatewaySender::new(
            channel,
            GatewayConfig {
                url: "http://gateway.invalid/send".into(),
                token: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn from_env_returns_none_without_url() {
        std::env::remove_var("SMS_GATEWAY_URL");
        assert!(GatewayConfig::from_env(Channel::Sms).is_none());
        assert!(GatewayConfig::from_env(Channel::Email).is_none());
    }

    #[test]
    fn sms_payload_is_flat_text() {
        let meta = Metadata::from_json(json!({"title": "Code", "body": "123456"})).unwrap();
        let payload = sender(Channel::Sms).payload("+15550100", Topic::Updates, &meta);
        assert_eq!(payload["to"], "+15550100");
        assert_eq!(payload["message"], "Code\n123456");
        assert_eq!(payload["topic"], "updates");
    }

    #[test]
    fn push_payload_carries_metadata() {
        let meta = Metadata::from_json(json!({"deepLink": "app://orders/7"})).unwrap();
        let payload = sender(Channel::Push).payload("tok-1", Topic::Marketing, &meta);
        assert_eq!(payload["token"], "tok-1");
        assert_eq!(payload["data"]["deepLink"], "app://orders/7");
        assert_eq!(payload["topic"], "marketing");
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_request_error() {
        let result = sender(Channel::Push)
            .send("tok-1", Topic::Updates, &Metadata::default())
            .await;
        assert!(matches!(result, Err(SendError::Request(_))));
    }
}
