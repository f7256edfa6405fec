use std::sync::Arc;

use courier_core::store::{DispatchLog, PreferenceStore};
use courier_delivery::Dispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub preferences: Arc<dyn PreferenceStore>,
    pub dispatch_log: Arc<dyn DispatchLog>,
    pub dispatcher: Arc<Dispatcher>,
}
