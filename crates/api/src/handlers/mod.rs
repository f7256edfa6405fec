//! Request handlers, one module per resource.

pub mod notification;
pub mod preference;
