//! Handlers for the `/preferences` resource.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use courier_core::error::CoreError;
use courier_core::preference::{PreferenceInput, PreferencePatchInput, PreferenceRecord};

use crate::error::AppResult;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/preferences
///
/// Create a preference record. Omitted flags take their defaults.
pub async fn create_preference(
    State(state): State<AppState>,
    payload: Result<Json<PreferenceInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let new = input.into_new_preference()?;
    let record = state.preferences.create(new).await?;

    tracing::info!(user_id = %record.user_id, "Preferences created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// GET /api/v1/preferences
///
/// List preference records, oldest first.
pub async fn list_preferences(
    State(state): State<AppState>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> AppResult<Json<DataResponse<Vec<PreferenceRecord>>>> {
    let Query(params) = params?;
    let records = state
        .preferences
        .list(params.limit(), params.offset())
        .await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/preferences/{user_id}
pub async fn get_preference(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<DataResponse<PreferenceRecord>>> {
    let record = state
        .preferences
        .get(&user_id)
        .await?
        .ok_or_else(|| CoreError::user_not_found(&user_id))?;
    Ok(Json(DataResponse { data: record }))
}

/// PATCH /api/v1/preferences/{user_id}
///
/// Partial update. Only the fields and individual flags present in the body
/// change.
pub async fn update_preference(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<PreferencePatchInput>, JsonRejection>,
) -> AppResult<Json<DataResponse<PreferenceRecord>>> {
    let Json(input) = payload?;
    let patch = input.into_patch(&user_id)?;
    let record = state
        .preferences
        .update(&user_id, &patch)
        .await?
        .ok_or_else(|| CoreError::user_not_found(&user_id))?;

    tracing::info!(user_id = %user_id, "Preferences updated");
    Ok(Json(DataResponse { data: record }))
}

/// DELETE /api/v1/preferences/{user_id}
///
/// Idempotent: 204 whether or not a record existed. Dispatch history for the
/// user is kept.
pub async fn delete_preference(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted = state.preferences.delete(&user_id).await?;
    if deleted {
        tracing::info!(user_id = %user_id, "Preferences deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}
