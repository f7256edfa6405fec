//! Route definitions for the `/notifications` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// POST   /send                         -> send_notification
/// GET    /attempts/{attempt_id}        -> get_attempt
/// GET    /users/{user_id}/attempts     -> list_user_attempts
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(notification::send_notification))
        .route("/attempts/{attempt_id}", get(notification::get_attempt))
        .route(
            "/users/{user_id}/attempts",
            get(notification::list_user_attempts),
        )
}
