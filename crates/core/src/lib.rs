//! Courier domain core.
//!
//! Pure domain types and rules with zero internal dependencies:
//!
//! - [`channels`] / [`topics`] - the channel, topic and frequency vocabulary.
//! - [`preference`] - preference records and validated create/patch inputs.
//! - [`eligibility`] - the topic x channel x frequency eligibility rule.
//! - [`dispatch`] - dispatch attempts and outcome aggregation.
//! - [`request`] - validated notification send requests.
//! - [`metadata`] - the bounded scalar metadata schema.
//! - [`store`] - persistence capabilities and in-memory implementations.

pub mod channels;
pub mod dispatch;
pub mod eligibility;
pub mod error;
pub mod metadata;
pub mod preference;
pub mod request;
pub mod store;
pub mod topics;
pub mod types;
