//! Axum WebSocket upgrade handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws?token=...`: Upgrade HTTP connection to WebSocket.
///
/// Refused with `401 Unauthorized` when the responder requires a token and
/// the query does not carry it.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    if let Some(expected) = &state.token
        && params.get("token").map(String::as_str) != Some(&**expected)
    {
        tracing::warn!("ws upgrade refused: bad token");
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }

    let event_rx = state.robot.event_bus().subscribe();
    let robot = Arc::clone(&state.robot);

    ws.on_upgrade(move |socket| run_connection(socket, event_rx, robot))
}
