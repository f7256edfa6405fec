pub mod health;
pub mod notifications;
pub mod preferences;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /preferences                                   create, list
/// /preferences/{user_id}                         get, patch, delete
///
/// /notifications/send                            dispatch (POST)
/// /notifications/attempts/{attempt_id}           read one attempt
/// /notifications/users/{user_id}/attempts        attempts for a user
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/preferences", preferences::router())
        .nest("/notifications", notifications::router())
}
