//! The channel dispatcher.
//!
//! [`Dispatcher::dispatch`] resolves the recipient's preferences, picks the
//! eligible channels, opens an attempt in the dispatch log, fans the sends
//! out concurrently and appends each channel's outcome as it settles.
//!
//! The sends run on a spawned task, so dropping the future returned by
//! `dispatch` never leaves an opened attempt with pending channels.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_core::channels::{dedupe_channels, Channel};
use courier_core::dispatch::{ChannelResult, ChannelStatus, DispatchAttempt};
use courier_core::eligibility::{eligible_channels, is_eligible};
use courier_core::error::CoreError;
use courier_core::metadata::Metadata;
use courier_core::preference::PreferenceRecord;
use courier_core::request::NotificationRequest;
use courier_core::store::{DispatchLog, PreferenceStore};
use courier_core::topics::Topic;
use courier_core::types::AttemptId;
use futures::future::join_all;
use tracing::Instrument;

use crate::sender::SenderRegistry;

/// Default bound on a single sender call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(5000);

/// Sends notifications and records every attempt.
#[derive(Clone)]
pub struct Dispatcher {
    preferences: Arc<dyn PreferenceStore>,
    log: Arc<dyn DispatchLog>,
    senders: SenderRegistry,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        log: Arc<dyn DispatchLog>,
        senders: SenderRegistry,
    ) -> Self {
        Self {
            preferences,
            log,
            senders,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Dispatch one notification.
    ///
    /// Fails with `NotFound { entity: "User" }` when the user has no
    /// preference record; nothing is logged in that case. Channel failures
    /// are not errors: they are recorded on the returned attempt. Only a
    /// dispatch log failure surfaces as an error once the attempt is open.
    pub async fn dispatch(&self, request: NotificationRequest) -> Result<DispatchAttempt, CoreError> {
        let span = tracing::info_span!(
            "dispatch",
            user_id = %request.user_id,
            topic = %request.topic,
            attempt_id = tracing::field::Empty,
            timezone = tracing::field::Empty,
        );
        self.dispatch_inner(request).instrument(span).await
    }

    async fn dispatch_inner(&self, request: NotificationRequest) -> Result<DispatchAttempt, CoreError> {
        let record = self
            .preferences
            .get(&request.user_id)
            .await?
            .ok_or_else(|| CoreError::user_not_found(&request.user_id))?;

        let (requested, eligible) = match request.channels {
            Some(requested) => {
                let requested = dedupe_channels(requested);
                let eligible: Vec<Channel> = requested
                    .iter()
                    .copied()
                    .filter(|channel| is_eligible(&record, request.topic, *channel))
                    .collect();
                (requested, eligible)
            }
            None => (
                record.channels.enabled(),
                eligible_channels(&record, request.topic),
            ),
        };

        let attempt = DispatchAttempt::open(
            record.user_id.clone(),
            request.topic,
            record.timezone.clone(),
            requested,
            &eligible,
            request.metadata,
            Utc::now(),
        );
        let span = tracing::Span::current();
        span.record("attempt_id", tracing::field::display(attempt.attempt_id));
        span.record("timezone", record.timezone.as_str());

        self.log.open_attempt(&attempt).await?;

        if eligible.is_empty() {
            tracing::info!("No eligible channel, notification suppressed");
        } else {
            // Once opened, every channel must settle even if the caller is dropped.
            let dispatcher = self.clone();
            let attempt_id = attempt.attempt_id;
            let topic = attempt.topic;
            let metadata = attempt.metadata.clone();
            let settlement = tokio::spawn(
                async move {
                    dispatcher
                        .settle_all(attempt_id, &record, &eligible, topic, &metadata)
                        .await
                }
                .instrument(span.clone()),
            );
            settlement.await.map_err(|err| {
                CoreError::Internal(format!("Channel settlement for {attempt_id} aborted: {err}"))
            })??;
        }

        let stored = self
            .log
            .get_attempt(attempt.attempt_id)
            .await?
            .ok_or_else(|| {
                CoreError::Internal(format!(
                    "Dispatch attempt {} missing after write",
                    attempt.attempt_id
                ))
            })?;
        if !stored.is_terminal() {
            return Err(CoreError::Internal(format!(
                "Dispatch attempt {} still has pending channels",
                stored.attempt_id
            )));
        }
        tracing::info!(overall_status = ?stored.overall_status(), "Dispatch complete");
        Ok(stored)
    }

    async fn settle_all(
        &self,
        attempt_id: AttemptId,
        record: &PreferenceRecord,
        channels: &[Channel],
        topic: Topic,
        metadata: &Metadata,
    ) -> Result<(), CoreError> {
        join_all(
            channels
                .iter()
                .map(|channel| self.settle_channel(attempt_id, record, *channel, topic, metadata)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Send over one channel and append its outcome to the log.
    async fn settle_channel(
        &self,
        attempt_id: AttemptId,
        record: &PreferenceRecord,
        channel: Channel,
        topic: Topic,
        metadata: &Metadata,
    ) -> Result<(), CoreError> {
        let result = self.send_channel(record, channel, topic, metadata).await;
        match result.status {
            ChannelStatus::Sent => tracing::info!(%channel, "Channel sent"),
            _ => tracing::warn!(
                %channel,
                reason = result.failure_reason.as_deref().unwrap_or_default(),
                "Channel failed"
            ),
        }
        self.log.record_outcome(attempt_id, channel, &result).await
    }

    async fn send_channel(
        &self,
        record: &PreferenceRecord,
        channel: Channel,
        topic: Topic,
        metadata: &Metadata,
    ) -> ChannelResult {
        let Some(sender) = self.senders.get(channel) else {
            return ChannelResult::failed(format!("No sender configured for {channel}"));
        };
        let Some(address) = record.address_for(channel) else {
            return ChannelResult::failed(format!("No {channel} address on record"));
        };

        match tokio::time::timeout(self.send_timeout, sender.send(address, topic, metadata)).await {
            Ok(Ok(())) => ChannelResult::sent(Utc::now()),
            Ok(Err(err)) => ChannelResult::failed(err.to_string()),
            Err(_) => ChannelResult::timed_out(),
        }
    }
}
