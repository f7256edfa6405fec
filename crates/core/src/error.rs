#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown topic: {0}")]
    InvalidTopic(String),

    #[error("Unknown channel: {0}")]
    InvalidChannel(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for the "no preference record for this user" case.
    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: "User",
            id: user_id.into(),
        }
    }
}
