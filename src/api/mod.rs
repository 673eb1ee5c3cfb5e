//! HTTP layer: router composition for the responder.
//!
//! `/health` and `/state` are plain JSON endpoints; `/ws` upgrades to the
//! command protocol.

pub mod handlers;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the complete router with every responder endpoint.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::system::routes())
        .route("/ws", get(ws_handler))
}
