//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument and return raw `sqlx` results.

pub mod dispatch_log_repo;
pub mod preference_repo;

pub use dispatch_log_repo::DispatchLogRepo;
pub use preference_repo::PreferenceRepo;
