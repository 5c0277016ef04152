//! WebSocket upgrade handlers for sync rooms.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::IntoResponse;

use super::connection::run_connection;
use super::engine::SyncEngine;
use crate::app_state::AppState;

/// `GET /share/ws/{room}` — Join a sync room through the API listener.
pub async fn share_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> impl IntoResponse {
    let engine = Arc::clone(&state.sync);
    ws.on_upgrade(move |socket| run_connection(socket, engine, room))
}

/// Any path on the sync listener — Join the room named by the path.
pub async fn room_ws_handler(
    ws: WebSocketUpgrade,
    State(engine): State<Arc<SyncEngine>>,
    uri: Uri,
) -> impl IntoResponse {
    let room = SyncEngine::room_for_path(uri.path());
    ws.on_upgrade(move |socket| run_connection(socket, engine, room))
}
