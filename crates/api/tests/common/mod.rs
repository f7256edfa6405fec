#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use courier_core::channels::Channel;
use courier_core::metadata::Metadata;
use courier_core::store::{MemoryDispatchLog, MemoryPreferenceStore};
use courier_core::topics::Topic;
use courier_delivery::{ChannelSender, Dispatcher, SendError, SenderRegistry};
use http_body_util::BodyExt;
use tower::ServiceExt;

use courier_api::config::{LogFormat, ServerConfig};
use courier_api::router::build_app_router;
use courier_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        sender_timeout: Duration::from_millis(500),
        database_url: None,
        log_format: LogFormat::Pretty,
    }
}

/// A sender that either always succeeds or always fails.
pub struct StubSender {
    channel: Channel,
    fail: bool,
}

#[async_trait]
impl ChannelSender for StubSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, _: &str, _: Topic, _: &Metadata) -> Result<(), SendError> {
        if self.fail {
            Err(SendError::Rejected("stub failure".into()))
        } else {
            Ok(())
        }
    }
}

pub fn ok_sender(channel: Channel) -> Arc<dyn ChannelSender> {
    Arc::new(StubSender {
        channel,
        fail: false,
    })
}

pub fn failing_sender(channel: Channel) -> Arc<dyn ChannelSender> {
    Arc::new(StubSender {
        channel,
        fail: true,
    })
}

/// Build the full application router over in-memory stores with the given
/// senders.
pub fn build_test_app_with(senders: Vec<Arc<dyn ChannelSender>>) -> Router {
    let config = test_config();
    let preferences = Arc::new(MemoryPreferenceStore::new());
    let dispatch_log = Arc::new(MemoryDispatchLog::new());

    let mut registry = SenderRegistry::new();
    for sender in senders {
        registry.register(sender);
    }
    let dispatcher = Dispatcher::new(preferences.clone(), dispatch_log.clone(), registry)
        .with_send_timeout(config.sender_timeout);

    let state = AppState {
        preferences,
        dispatch_log,
        dispatcher: Arc::new(dispatcher),
    };
    build_app_router(state, &config)
}

/// Every channel has a succeeding sender.
pub fn build_test_app() -> Router {
    build_test_app_with(Channel::ALL.into_iter().map(ok_sender).collect())
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a request through a clone of `app`, so one router serves a whole test.
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

async fn with_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    with_json(app, Method::POST, uri, body).await
}

pub async fn patch_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    with_json(app, Method::PATCH, uri, body).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a preference record through the API and return its JSON.
pub async fn create_user(app: &Router, body: serde_json::Value) -> serde_json::Value {
    let response = post_json(app, "/api/v1/preferences", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}
