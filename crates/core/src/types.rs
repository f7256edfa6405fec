/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Dispatch attempts are keyed by a random UUID generated at creation.
pub type AttemptId = uuid::Uuid;

/// Opaque caller-supplied user identifier.
pub type UserId = String;
