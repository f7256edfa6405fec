//! Integration tests for the Postgres dispatch log.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use courier_core::channels::Channel;
use courier_core::dispatch::{ChannelResult, ChannelStatus, DispatchAttempt, OverallStatus};
use courier_core::error::CoreError;
use courier_core::metadata::Metadata;
use courier_core::store::DispatchLog;
use courier_core::topics::Topic;
use courier_db::PgDispatchLog;
use serde_json::json;
use sqlx::PgPool;

fn attempt(user_id: &str, channels: &[Channel]) -> DispatchAttempt {
    DispatchAttempt::open(
        user_id,
        Topic::Updates,
        "Europe/Berlin",
        channels.to_vec(),
        channels,
        Metadata::from_json(json!({"campaign": "spring"})).unwrap(),
        Utc::now(),
    )
}

#[sqlx::test(migrations = "./migrations")]
async fn open_then_settle_folds_outcomes(pool: PgPool) {
    let log = PgDispatchLog::new(pool);
    let a = attempt("u-1", &[Channel::Email, Channel::Sms]);
    log.open_attempt(&a).await.unwrap();

    let opened = log.get_attempt(a.attempt_id).await.unwrap().unwrap();
    assert_eq!(opened.overall_status(), OverallStatus::Pending);
    assert_eq!(opened.user_timezone, "Europe/Berlin");
    assert_eq!(opened.metadata, a.metadata);

    log.record_outcome(a.attempt_id, Channel::Email, &ChannelResult::sent(Utc::now()))
        .await
        .unwrap();
    log.record_outcome(a.attempt_id, Channel::Sms, &ChannelResult::failed("gateway down"))
        .await
        .unwrap();

    let settled = log.get_attempt(a.attempt_id).await.unwrap().unwrap();
    assert_eq!(settled.overall_status(), OverallStatus::PartialFailure);
    assert_eq!(
        settled.per_channel_results[&Channel::Sms].failure_reason.as_deref(),
        Some("gateway down")
    );
    assert!(settled.per_channel_results[&Channel::Email].sent_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn zero_channel_attempt_is_suppressed(pool: PgPool) {
    let log = PgDispatchLog::new(pool);
    let a = attempt("u-1", &[]);
    log.open_attempt(&a).await.unwrap();

    let stored = log.get_attempt(a.attempt_id).await.unwrap().unwrap();
    assert_eq!(stored.overall_status(), OverallStatus::Suppressed);
}

#[sqlx::test(migrations = "./migrations")]
async fn outcome_is_recorded_exactly_once(pool: PgPool) {
    let log = PgDispatchLog::new(pool);
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

    let stored = log.get_attempt(a.attempt_id).await.unwrap().unwrap();
    assert_eq!(
        stored.per_channel_results[&Channel::Email].status,
        ChannelStatus::Sent
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn unopened_channel_is_rejected(pool: PgPool) {
    let log = PgDispatchLog::new(pool);
    let a = attempt("u-1", &[Channel::Email]);
    log.open_attempt(&a).await.unwrap();

    assert_matches!(
        log.record_outcome(a.attempt_id, Channel::Push, &ChannelResult::sent(Utc::now()))
            .await,
        Err(CoreError::Conflict(_))
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_attempt_is_not_found(pool: PgPool) {
    let log = PgDispatchLog::new(pool);
    assert_matches!(
        log.record_outcome(
            uuid::Uuid::new_v4(),
            Channel::Email,
            &ChannelResult::sent(Utc::now())
        )
        .await,
        Err(CoreError::NotFound { .. })
    );
    assert!(log.get_attempt(uuid::Uuid::new_v4()).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn pending_outcome_is_rejected(pool: PgPool) {
    let log = PgDispatchLog::new(pool);
    let a = attempt("u-1", &[Channel::Email]);
    log.open_attempt(&a).await.unwrap();

    assert_matches!(
        log.record_outcome(a.attempt_id, Channel::Email, &ChannelResult::pending())
            .await,
        Err(CoreError::Validation(_))
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn history_rejects_in_place_edits(pool: PgPool) {
    let log = PgDispatchLog::new(pool.clone());
    let a = attempt("u-1", &[Channel::Email]);
    log.open_attempt(&a).await.unwrap();

    let update = sqlx::query("UPDATE dispatch_attempts SET topic = 'marketing' WHERE id = $1")
        .bind(a.attempt_id)
        .execute(&pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM dispatch_channel_entries WHERE attempt_id = $1")
        .bind(a.attempt_id)
        .execute(&pool)
        .await;
    assert!(delete.is_err());
}

#[sqlx::test(migrations = "./migrations")]
async fn list_for_user_is_newest_first(pool: PgPool) {
    let log = PgDispatchLog::new(pool);
    let now = Utc::now();
    let mut ids = Vec::new();
    for i in 0..3 {
        let mut a = attempt("u-1", &[Channel::Email]);
        a.created_at = now + Duration::seconds(i);
        log.open_attempt(&a).await.unwrap();
        ids.push(a.attempt_id);
    }
    log.open_attempt(&attempt("u-2", &[Channel::Push]))
        .await
        .unwrap();

    let page = log.list_for_user("u-1", 2, 0).await.unwrap();
    let got: Vec<_> = page.iter().map(|a| a.attempt_id).collect();
    assert_eq!(got, vec![ids[2], ids[1]]);

    let rest = log.list_for_user("u-1", 10, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].attempt_id, ids[0]);
    assert!(rest[0].per_channel_results.contains_key(&Channel::Email));
}
