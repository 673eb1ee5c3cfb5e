//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::RobotService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Robot service applying received commands.
    pub robot: Arc<RobotService>,
    /// Access token required on `/ws`; `None` accepts everyone.
    pub token: Option<Arc<str>>,
}
