//! Repository for `dispatch_attempts` and `dispatch_channel_entries`.
//!
//! Both tables are insert-only; triggers in the migration reject
//! `UPDATE` and `DELETE`.

use courier_core::channels::Channel;
use courier_core::dispatch::{ChannelResult, ChannelStatus, DispatchAttempt};
use courier_core::types::AttemptId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::dispatch::{AttemptRow, ChannelEntryRow};

/// Column list for `dispatch_attempts` queries.
const ATTEMPT_COLUMNS: &str =
    "id, user_id, topic, user_timezone, requested_channels, metadata, created_at";

/// Column list for `dispatch_channel_entries` queries.
const ENTRY_COLUMNS: &str = "id, attempt_id, channel, status, sent_at, failure_reason";

/// Provides append and read operations for the dispatch log.
pub struct DispatchLogRepo;

impl DispatchLogRepo {
    /// Insert the attempt header and one `pending` entry per attempted channel
    /// in a single transaction.
    pub async fn open_attempt(pool: &PgPool, attempt: &DispatchAttempt) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO dispatch_attempts \
                (id, user_id, topic, user_timezone, requested_channels, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(attempt.attempt_id)
        .bind(&attempt.user_id)
        .bind(attempt.topic.as_str())
        .bind(&attempt.user_timezone)
        .bind(Json(&attempt.requested_channels))
        .bind(Json(&attempt.metadata))
        .bind(attempt.created_at)
        .execute(&mut *tx)
        .await?;

        for channel in attempt.per_channel_results.keys() {
            sqlx::query(
                "INSERT INTO dispatch_channel_entries (attempt_id, channel, status) \
                 VALUES ($1, $2, $3)",
            )
            .bind(attempt.attempt_id)
            .bind(channel.as_str())
            .bind(ChannelStatus::Pending.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Whether an attempt header exists.
    pub async fn attempt_exists(pool: &PgPool, attempt_id: AttemptId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM dispatch_attempts WHERE id = $1)")
            .bind(attempt_id)
            .fetch_one(pool)
            .await
    }

    /// Append a terminal entry for `channel`.
    ///
    /// Returns `false` when the channel was never opened on the attempt.
    /// A second terminal entry for the same channel violates
    /// `uq_dispatch_channel_entries_settled`.
    pub async fn append_outcome(
        pool: &PgPool,
        attempt_id: AttemptId,
        channel: Channel,
        result: &ChannelResult,
    ) -> Result<bool, sqlx::Error> {
        let inserted = sqlx::query(
            "INSERT INTO dispatch_channel_entries \
                (attempt_id, channel, status, sent_at, failure_reason) \
             SELECT $1, $2, $3, $4, $5 \
             WHERE EXISTS ( \
                SELECT 1 FROM dispatch_channel_entries \
                WHERE attempt_id = $1 AND channel = $2 AND status = 'pending')",
        )
        .bind(attempt_id)
        .bind(channel.as_str())
        .bind(result.status.as_str())
        .bind(result.sent_at)
        .bind(&result.failure_reason)
        .execute(pool)
        .await?;
        Ok(inserted.rows_affected() > 0)
    }

    pub async fn find_attempt(
        pool: &PgPool,
        attempt_id: AttemptId,
    ) -> Result<Option<AttemptRow>, sqlx::Error> {
        let query = format!("SELECT {ATTEMPT_COLUMNS} FROM dispatch_attempts WHERE id = $1");
        sqlx::query_as::<_, AttemptRow>(&query)
            .bind(attempt_id)
            .fetch_optional(pool)
            .await
    }

    /// Attempts for a user, newest first.
    pub async fn list_attempts_for_user(
        pool: &PgPool,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttemptRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM dispatch_attempts \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, AttemptRow>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Every channel entry for the given attempts, in insertion order.
    pub async fn entries_for_attempts(
        pool: &PgPool,
        attempt_ids: &[AttemptId],
    ) -> Result<Vec<ChannelEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM dispatch_channel_entries \
             WHERE attempt_id = ANY($1) \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, ChannelEntryRow>(&query)
            .bind(attempt_ids)
            .fetch_all(pool)
            .await
    }
}
