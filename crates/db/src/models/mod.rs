//! Row structs for the courier tables.
//!
//! Each row converts into its `courier-core` counterpart; rows never leave
//! this crate.

pub mod dispatch;
pub mod preference;
