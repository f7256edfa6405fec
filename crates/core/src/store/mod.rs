//! Persistence capabilities used by the dispatcher and the HTTP layer.
//!
//! Both traits are object safe and shared as `Arc<dyn ...>`. The Postgres
//! implementations live in `courier-db`; [`memory`] provides in-process
//! implementations for tests and database-less deployments.

pub mod memory;

use async_trait::async_trait;

use crate::channels::Channel;
use crate::dispatch::{ChannelResult, DispatchAttempt};
use crate::error::CoreError;
use crate::preference::{NewPreference, PreferencePatch, PreferenceRecord};
use crate::types::AttemptId;

pub use memory::{MemoryDispatchLog, MemoryPreferenceStore};

/// One preference document per user.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Insert a new record. Duplicate `user_id` or `email` is a
    /// [`CoreError::Conflict`].
    async fn create(&self, new: NewPreference) -> Result<PreferenceRecord, CoreError>;

    async fn get(&self, user_id: &str) -> Result<Option<PreferenceRecord>, CoreError>;

    /// Records ordered by creation time, oldest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<PreferenceRecord>, CoreError>;

    /// Apply a partial update atomically. Returns `None` when no record exists.
    async fn update(
        &self,
        user_id: &str,
        patch: &PreferencePatch,
    ) -> Result<Option<PreferenceRecord>, CoreError>;

    /// Remove a record. Returns whether anything was deleted.
    async fn delete(&self, user_id: &str) -> Result<bool, CoreError>;

    async fn health_check(&self) -> Result<(), CoreError>;
}

/// Append-only history of dispatch attempts.
///
/// No update or delete operation exists. Channel outcomes are
/// appended as separate entries and folded into the attempt on read.
#[async_trait]
pub trait DispatchLog: Send + Sync {
    /// Persist the attempt header and a `pending` entry per channel.
    async fn open_attempt(&self, attempt: &DispatchAttempt) -> Result<(), CoreError>;

    /// Append the terminal outcome of one channel.
    ///
    /// Fails with [`CoreError::Conflict`] if the channel already settled or
    /// was never opened on the attempt, and with [`CoreError::Validation`]
    /// if `result` is not terminal.
    async fn record_outcome(
        &self,
        attempt_id: AttemptId,
        channel: Channel,
        result: &ChannelResult,
    ) -> Result<(), CoreError>;

    async fn get_attempt(&self, attempt_id: AttemptId)
        -> Result<Option<DispatchAttempt>, CoreError>;

    /// Attempts for a user, newest first.
    async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DispatchAttempt>, CoreError>;
}
