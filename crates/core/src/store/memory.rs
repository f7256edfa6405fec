//! In-process store implementations.
//!
//! Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
//! shared across the application. State is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{DispatchLog, PreferenceStore};
use crate::channels::Channel;
use crate::dispatch::{ChannelResult, DispatchAttempt};
use crate::error::CoreError;
use crate::preference::{NewPreference, PreferencePatch, PreferenceRecord};
use crate::types::AttemptId;

fn page_bounds(limit: i64, offset: i64) -> (usize, usize) {
    (limit.max(0) as usize, offset.max(0) as usize)
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Preference records keyed by user id.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    records: RwLock<HashMap<String, PreferenceRecord>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(records: &HashMap<String, PreferenceRecord>, email: &str, except: &str) -> bool {
    records
        .values()
        .any(|r| r.user_id != except && r.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn create(&self, new: NewPreference) -> Result<PreferenceRecord, CoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&new.user_id) {
            return Err(CoreError::Conflict(format!(
                "Preferences already exist for user {}",
                new.user_id
            )));
        }
        if email_taken(&records, &new.email, &new.user_id) {
            return Err(CoreError::Conflict(format!(
                "Email {} is already registered",
                new.email
            )));
        }

        let record = PreferenceRecord::from_new(new, Utc::now());
        records.insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, user_id: &str) -> Result<Option<PreferenceRecord>, CoreError> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<PreferenceRecord>, CoreError> {
        let (limit, offset) = page_bounds(limit, offset);
        let records = self.records.read().await;
        let mut all: Vec<&PreferenceRecord> = records.values().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(all.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn update(
        &self,
        user_id: &str,
        patch: &PreferencePatch,
    ) -> Result<Option<PreferenceRecord>, CoreError> {
        let mut records = self.records.write().await;
        if !records.contains_key(user_id) {
            return Ok(None);
        }
        if patch.is_empty() {
            return Ok(records.get(user_id).cloned());
        }
        if let Some(email) = &patch.email {
            if email_taken(&records, email, user_id) {
                return Err(CoreError::Conflict(format!(
                    "Email {email} is already registered"
                )));
            }
        }

        let Some(record) = records.get_mut(user_id) else {
            return Ok(None);
        };
        patch.apply(record);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete(&self, user_id: &str) -> Result<bool, CoreError> {
        Ok(self.records.write().await.remove(user_id).is_some())
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatch log
// ---------------------------------------------------------------------------

/// A terminal channel outcome appended after the attempt was opened.
struct OutcomeEntry {
    attempt_id: AttemptId,
    channel: Channel,
    result: ChannelResult,
}

#[derive(Default)]
struct LogInner {
    /// Attempts exactly as opened, in insertion order.
    opened: Vec<DispatchAttempt>,
    outcomes: Vec<OutcomeEntry>,
}

impl LogInner {
    fn fold(&self, opened: &DispatchAttempt) -> DispatchAttempt {
        let mut attempt = opened.clone();
        for entry in self
            .outcomes
            .iter()
            .filter(|e| e.attempt_id == opened.attempt_id)
        {
            attempt
                .per_channel_results
                .insert(entry.channel, entry.result.clone());
        }
        attempt
    }
}

/// Append-only dispatch history held in memory.
#[derive(Default)]
pub struct MemoryDispatchLog {
    inner: RwLock<LogInner>,
}

impl MemoryDispatchLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DispatchLog for MemoryDispatchLog {
    async fn open_attempt(&self, attempt: &DispatchAttempt) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .opened
            .iter()
            .any(|a| a.attempt_id == attempt.attempt_id)
        {
            return Err(CoreError::Conflict(format!(
                "Dispatch attempt {} already exists",
                attempt.attempt_id
            )));
        }
        let mut opened = attempt.clone();
        for result in opened.per_channel_results.values_mut() {
            *result = ChannelResult::pending();
        }
        inner.opened.push(opened);
        Ok(())
    }

    async fn record_outcome(
        &self,
        attempt_id: AttemptId,
        channel: Channel,
        result: &ChannelResult,
    ) -> Result<(), CoreError> {
        if !result.status.is_terminal() {
            return Err(CoreError::Validation(
                "Only terminal channel outcomes can be recorded".into(),
            ));
        }

        let mut inner = self.inner.write().await;
        let opened = inner
            .opened
            .iter()
            .find(|a| a.attempt_id == attempt_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "DispatchAttempt",
                id: attempt_id.to_string(),
            })?;
        if !opened.per_channel_results.contains_key(&channel) {
            return Err(CoreError::Conflict(format!(
                "Channel {channel} was not attempted on {attempt_id}"
            )));
        }
        if inner
            .outcomes
            .iter()
            .any(|e| e.attempt_id == attempt_id && e.channel == channel)
        {
            return Err(CoreError::Conflict(format!(
                "Channel {channel} on {attempt_id} already settled"
            )));
        }

        inner.outcomes.push(OutcomeEntry {
            attempt_id,
            channel,
            result: result.clone(),
        });
        Ok(())
    }

    async fn get_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Option<DispatchAttempt>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .opened
            .iter()
            .find(|a| a.attempt_id == attempt_id)
            .map(|a| inner.fold(a)))
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DispatchAttempt>, CoreError> {
        let (limit, offset) = page_bounds(limit, offset);
        let inner = self.inner.read().await;
        Ok(inner
            .opened
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .skip(offset)
            .take(limit)
            .map(|a| inner.fold(a))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::dispatch::{ChannelStatus, OverallStatus};
    use crate::metadata::Metadata;
    use crate::topics::Topic;

    fn attempt(user_id: &str, channels: &[Channel]) -> DispatchAttempt {
        DispatchAttempt::open(
            user_id,
            Topic::Updates,
            "UTC",
            channels.to_vec(),
            channels,
            Metadata::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn create_rejects_duplicate_user_and_email() {
        let store = MemoryPreferenceStore::new();
        store
            .create(NewPreference::with_defaults("u-1", "a@example.com"))
            .await
            .unwrap();

        assert_matches!(
            store
                .create(NewPreference::with_defaults("u-1", "b@example.com"))
                .await,
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            store
                .create(NewPreference::with_defaults("u-2", "A@example.com"))
                .await,
            Err(CoreError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn update_missing_record_returns_none() {
        let store = MemoryPreferenceStore::new();
        let patch = PreferencePatch {
            frequency: Some(crate::topics::Frequency::Never),
            ..Default::default()
        };
        assert!(store.update("ghost", &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_rejects_email_owned_by_someone_else() {
        let store = MemoryPreferenceStore::new();
        store
            .create(NewPreference::with_defaults("u-1", "a@example.com"))
            .await
            .unwrap();
        store
            .create(NewPreference::with_defaults("u-2", "b@example.com"))
            .await
            .unwrap();

        let patch = PreferencePatch {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        assert_matches!(store.update("u-2", &patch).await, Err(CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_missing_record_with_taken_email_returns_none() {
        let store = MemoryPreferenceStore::new();
        store
            .create(NewPreference::with_defaults("u-1", "a@example.com"))
            .await
            .unwrap();

        let patch = PreferencePatch {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        assert!(store.update("ghost", &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_patch_leaves_record_untouched() {
        let store = MemoryPreferenceStore::new();
        let created = store
            .create(NewPreference::with_defaults("u-1", "a@example.com"))
            .await
            .unwrap();

        let unchanged = store
            .update("u-1", &PreferencePatch::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryPreferenceStore::new();
        store
            .create(NewPreference::with_defaults("u-1", "a@example.com"))
            .await
            .unwrap();
        assert!(store.delete("u-1").await.unwrap());
        assert!(!store.delete("u-1").await.unwrap());
    }

    #[tokio::test]
    async fn outcomes_fold_into_attempt() {
        let log = MemoryDispatchLog::new();
        let a = attempt("u-1", &[Channel::Email, Channel::Sms]);
        log.open_attempt(&a).await.unwrap();

        let opened = log.get_attempt(a.attempt_id).await.unwrap().unwrap();
        assert_eq!(opened.overall_status(), OverallStatus::Pending);

        log.record_outcome(a.attempt_id, Channel::Sms, &ChannelResult::failed("down"))
            .await
            .unwrap();
        log.record_outcome(a.attempt_id, Channel::Email, &ChannelResult::sent(Utc::now()))
            .await
            .unwrap();

        let settled = log.get_attempt(a.attempt_id).await.unwrap().unwrap();
        assert_eq!(settled.overall_status(), OverallStatus::PartialFailure);
        assert_eq!(
            settled.per_channel_results[&Channel::Sms].status,
            ChannelStatus::Failed
        );
    }

    #[tokio::test]
    async fn outcome_is_recorded_exactly_once() {
        let log = MemoryDispatchLog::new();
        let a = attempt("u-1", &[Channel::Email]);
        log.open_attempt(&a).await.unwrap();
        log.record_outcome(a.attempt_id, Channel::Email, &ChannelResult::sent(Utc::now()))
            .await
            .unwrap();

        assert_matches!(
            log.record_outcome(a.attempt_id, Channel::Email, &ChannelResult::failed("late"))
                .await,
            Err(CoreError::Conflict(_))
        );
        let settled = log.get_attempt(a.attempt_id).await.unwrap().unwrap();
        assert_eq!(settled.overall_status(), OverallStatus::AllSent);
    }

    #[tokio::test]
    async fn outcome_for_unopened_channel_conflicts() {
        let log = MemoryDispatchLog::new();
        let a = attempt("u-1", &[Channel::Email]);
        log.open_attempt(&a).await.unwrap();
        assert_matches!(
            log.record_outcome(a.attempt_id, Channel::Push, &ChannelResult::failed("x"))
                .await,
            Err(CoreError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn pending_outcome_is_rejected() {
        let log = MemoryDispatchLog::new();
        let a = attempt("u-1", &[Channel::Email]);
        log.open_attempt(&a).await.unwrap();
        assert_matches!(
            log.record_outcome(a.attempt_id, Channel::Email, &ChannelResult::pending())
                .await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn outcome_for_unknown_attempt_is_not_found() {
        let log = MemoryDispatchLog::new();
        assert_matches!(
            log.record_outcome(
                uuid::Uuid::new_v4(),
                Channel::Email,
                &ChannelResult::sent(Utc::now())
            )
            .await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn list_for_user_is_newest_first_and_paginated() {
        let log = MemoryDispatchLog::new();
        let first = attempt("u-1", &[]);
        let other = attempt("u-2", &[]);
        let second = attempt("u-1", &[]);
        for a in [&first, &other, &second] {
            log.open_attempt(a).await.unwrap();
        }

        let listed = log.list_for_user("u-1", 10, 0).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|a| a.attempt_id).collect();
        assert_eq!(ids, vec![second.attempt_id, first.attempt_id]);

        let page = log.list_for_user("u-1", 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].attempt_id, first.attempt_id);
    }
}
