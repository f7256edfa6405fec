//! Route definitions for the `/preferences` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::preference;
use crate::state::AppState;

/// Routes mounted at `/preferences`.
///
/// ```text
/// POST   /                -> create_preference
/// GET    /                -> list_preferences
/// GET    /{user_id}       -> get_preference
/// PATCH  /{user_id}       -> update_preference
/// DELETE /{user_id}       -> delete_preference
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(preference::list_preferences).post(preference::create_preference),
        )
        .route(
            "/{user_id}",
            get(preference::get_preference)
                .patch(preference::update_preference)
                .delete(preference::delete_preference),
        )
}
