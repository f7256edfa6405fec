//! Mapping from `sqlx` errors to domain errors.

use courier_core::error::CoreError;

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Classify a sqlx error into a [`CoreError`].
///
/// - Unique violations map to [`CoreError::Conflict`], naming the constraint.
/// - `RowNotFound` maps to [`CoreError::NotFound`] for `entity`.
/// - Everything else is logged and becomes [`CoreError::Internal`].
pub fn classify(err: sqlx::Error, entity: &'static str) -> CoreError {
    match err {
        sqlx::Error::RowNotFound => CoreError::NotFound {
            entity,
            id: String::new(),
        },
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            CoreError::Conflict(describe_conflict(constraint))
        }
        other => {
            tracing::error!(error = %other, entity, "Database error");
            CoreError::Internal("database error".into())
        }
    }
}

fn describe_conflict(constraint: &str) -> String {
    match constraint {
        "notification_preferences_pkey" => "Preferences already exist for this user".into(),
        "uq_notification_preferences_email" => "Email is already registered".into(),
        "uq_dispatch_channel_entries_settled" => "Channel outcome already recorded".into(),
        other => format!("Duplicate value violates unique constraint: {other}"),
    }
}
