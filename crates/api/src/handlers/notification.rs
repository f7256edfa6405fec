//! Handlers for the `/notifications` resource.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use courier_core::dispatch::{DispatchAttempt, OverallStatus};
use courier_core::error::CoreError;
use courier_core::request::SendNotificationInput;
use courier_core::types::AttemptId;

use crate::error::AppResult;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// HTTP status reported for each aggregate outcome.
///
/// The body always carries the attempt; callers should read `overallStatus`
/// rather than rely on the status code alone.
pub fn status_for(outcome: OverallStatus) -> StatusCode {
    match outcome {
        OverallStatus::AllSent => StatusCode::CREATED,
        OverallStatus::Suppressed => StatusCode::OK,
        OverallStatus::PartialFailure => StatusCode::MULTI_STATUS,
        OverallStatus::AllFailed => StatusCode::BAD_GATEWAY,
        OverallStatus::Pending => StatusCode::ACCEPTED,
    }
}

/// POST /api/v1/notifications/send
///
/// Validate the request, dispatch it and return the logged attempt.
pub async fn send_notification(
    State(state): State<AppState>,
    payload: Result<Json<SendNotificationInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<DispatchAttempt>>)> {
    let Json(input) = payload?;
    let request = input.validate()?;
    let attempt = state.dispatcher.dispatch(request).await?;

    Ok((
        status_for(attempt.overall_status()),
        Json(DataResponse { data: attempt }),
    ))
}

/// GET /api/v1/notifications/attempts/{attempt_id}
pub async fn get_attempt(
    State(state): State<AppState>,
    attempt_id: Result<Path<AttemptId>, PathRejection>,
) -> AppResult<Json<DataResponse<DispatchAttempt>>> {
    let Path(attempt_id) = attempt_id?;
    let attempt = state
        .dispatch_log
        .get_attempt(attempt_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "DispatchAttempt",
            id: attempt_id.to_string(),
        })?;
    Ok(Json(DataResponse { data: attempt }))
}

/// GET /api/v1/notifications/users/{user_id}/attempts
///
/// Attempts for a user, newest first. Works after the user's preferences
/// have been deleted.
pub async fn list_user_attempts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> AppResult<Json<DataResponse<Vec<DispatchAttempt>>>> {
    let Query(params) = params?;
    let attempts = state
        .dispatch_log
        .list_for_user(&user_id, params.limit(), params.offset())
        .await?;
    Ok(Json(DataResponse { data: attempts }))
}
