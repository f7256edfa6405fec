//! Outbound delivery for courier.
//!
//! - [`sender`] defines the [`ChannelSender`] capability and the registry
//!   the dispatcher looks senders up in.
//! - [`email`] and [`gateway`] are the shipped senders (SMTP and HTTP).
//! - [`dispatcher`] turns a validated request into a logged dispatch attempt.

pub mod dispatcher;
pub mod email;
pub mod gateway;
pub mod message;
pub mod sender;

pub use dispatcher::Dispatcher;
pub use sender::{ChannelSender, SendError, SenderRegistry};
