//! Repository for the `notification_preferences` table.

use std::collections::BTreeMap;

use courier_core::preference::{NewPreference, PreferencePatch};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::preference::PreferenceRow;

/// Column list for `notification_preferences` queries.
const COLUMNS: &str = "user_id, email, phone, push_token, timezone, topics, frequency, \
    channels, created_at, updated_at";

/// Provides CRUD operations for preference records.
pub struct PreferenceRepo;

impl PreferenceRepo {
    /// Insert a new preference record.
    pub async fn create(pool: &PgPool, new: &NewPreference) -> Result<PreferenceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences \
                (user_id, email, phone, push_token, timezone, topics, frequency, channels) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PreferenceRow>(&query)
            .bind(&new.user_id)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(&new.push_token)
            .bind(&new.timezone)
            .bind(Json(new.topics))
            .bind(new.frequency.as_str())
            .bind(Json(new.channels))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<PreferenceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_preferences WHERE user_id = $1");
        sqlx::query_as::<_, PreferenceRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List records, oldest first.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PreferenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_preferences \
             ORDER BY created_at ASC, user_id ASC \
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, PreferenceRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update in a single statement.
    ///
    /// Scalar fields use `COALESCE` so only `Some` values overwrite. Topic and
    /// channel flags are merged with the JSONB `||` operator, which replaces
    /// only the keys present in the patch.
    pub async fn update(
        pool: &PgPool,
        user_id: &str,
        patch: &PreferencePatch,
    ) -> Result<Option<PreferenceRow>, sqlx::Error> {
        let topics: BTreeMap<&str, bool> = patch
            .topics
            .iter()
            .map(|(topic, enabled)| (topic.as_str(), *enabled))
            .collect();
        let channels: BTreeMap<&str, bool> = patch
            .channels
            .iter()
            .map(|(channel, enabled)| (channel.as_str(), *enabled))
            .collect();

        let query = format!(
            "UPDATE notification_preferences SET \
                email = COALESCE($2, email), \
                phone = COALESCE($3, phone), \
                push_token = COALESCE($4, push_token), \
                timezone = COALESCE($5, timezone), \
                topics = topics || $6, \
                frequency = COALESCE($7, frequency), \
                channels = channels || $8, \
                updated_at = NOW() \
             WHERE user_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PreferenceRow>(&query)
            .bind(user_id)
            .bind(&patch.email)
            .bind(&patch.phone)
            .bind(&patch.push_token)
            .bind(&patch.timezone)
            .bind(Json(topics))
            .bind(patch.frequency.map(|f| f.as_str()))
            .bind(Json(channels))
            .fetch_optional(pool)
            .await
    }

    /// Delete a record. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_preferences WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
