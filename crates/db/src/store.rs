//! Postgres implementations of the `courier-core` store traits.

use async_trait::async_trait;
use courier_core::channels::Channel;
use courier_core::dispatch::{ChannelResult, DispatchAttempt};
use courier_core::error::CoreError;
use courier_core::preference::{NewPreference, PreferencePatch, PreferenceRecord};
use courier_core::store::{DispatchLog, PreferenceStore};
use courier_core::types::AttemptId;

use crate::error::classify;
use crate::repositories::{DispatchLogRepo, PreferenceRepo};
use crate::DbPool;

const PREFERENCE: &str = "Preference";
const ATTEMPT: &str = "DispatchAttempt";

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// [`PreferenceStore`] backed by `notification_preferences`.
#[derive(Clone)]
pub struct PgPreferenceStore {
    pool: DbPool,
}

impl PgPreferenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn create(&self, new: NewPreference) -> Result<PreferenceRecord, CoreError> {
        PreferenceRepo::create(&self.pool, &new)
            .await
            .map_err(|e| classify(e, PREFERENCE))?
            .into_record()
    }

    async fn get(&self, user_id: &str) -> Result<Option<PreferenceRecord>, CoreError> {
        PreferenceRepo::find_by_user_id(&self.pool, user_id)
            .await
            .map_err(|e| classify(e, PREFERENCE))?
            .map(|row| row.into_record())
            .transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<PreferenceRecord>, CoreError> {
        PreferenceRepo::list(&self.pool, limit, offset)
            .await
            .map_err(|e| classify(e, PREFERENCE))?
            .into_iter()
            .map(|row| row.into_record())
            .collect()
    }

    async fn update(
        &self,
        user_id: &str,
        patch: &PreferencePatch,
    ) -> Result<Option<PreferenceRecord>, CoreError> {
        if patch.is_empty() {
            return self.get(user_id).await;
        }
        PreferenceRepo::update(&self.pool, user_id, patch)
            .await
            .map_err(|e| classify(e, PREFERENCE))?
            .map(|row| row.into_record())
            .transpose()
    }

    async fn delete(&self, user_id: &str) -> Result<bool, CoreError> {
        PreferenceRepo::delete(&self.pool, user_id)
            .await
            .map_err(|e| classify(e, PREFERENCE))
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(|e| classify(e, PREFERENCE))
    }
}

// ---------------------------------------------------------------------------
// Dispatch log
// ---------------------------------------------------------------------------

/// [`DispatchLog`] backed by `dispatch_attempts` and `dispatch_channel_entries`.
#[derive(Clone)]
pub struct PgDispatchLog {
    pool: DbPool,
}

impl PgDispatchLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DispatchLog for PgDispatchLog {
    async fn open_attempt(&self, attempt: &DispatchAttempt) -> Result<(), CoreError> {
        DispatchLogRepo::open_attempt(&self.pool, attempt)
            .await
            .map_err(|e| classify(e, ATTEMPT))
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

        let appended = DispatchLogRepo::append_outcome(&self.pool, attempt_id, channel, result)
            .await
            .map_err(|e| classify(e, ATTEMPT))?;
        if appended {
            return Ok(());
        }

        let exists = DispatchLogRepo::attempt_exists(&self.pool, attempt_id)
            .await
            .map_err(|e| classify(e, ATTEMPT))?;
        if !exists {
            return Err(CoreError::NotFound {
                entity: ATTEMPT,
                id: attempt_id.to_string(),
            });
        }
        Err(CoreError::Conflict(format!(
            "Channel {channel} was not attempted on {attempt_id}"
        )))
    }

    async fn get_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Option<DispatchAttempt>, CoreError> {
        let Some(row) = DispatchLogRepo::find_attempt(&self.pool, attempt_id)
            .await
            .map_err(|e| classify(e, ATTEMPT))?
        else {
            return Ok(None);
        };
        let entries = DispatchLogRepo::entries_for_attempts(&self.pool, &[attempt_id])
            .await
            .map_err(|e| classify(e, ATTEMPT))?;
        row.into_attempt(&entries).map(Some)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DispatchAttempt>, CoreError> {
        let rows = DispatchLogRepo::list_attempts_for_user(&self.pool, user_id, limit, offset)
            .await
            .map_err(|e| classify(e, ATTEMPT))?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<AttemptId> = rows.iter().map(|r| r.id).collect();
        let entries = DispatchLogRepo::entries_for_attempts(&self.pool, &ids)
            .await
            .map_err(|e| classify(e, ATTEMPT))?;
        rows.into_iter()
            .map(|row| row.into_attempt(&entries))
            .collect()
    }
}
