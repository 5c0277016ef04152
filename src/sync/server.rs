//! Dedicated sync listener.
//!
//! Every request on this listener is a WebSocket upgrade; there is no
//! route table and no authentication.

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use super::engine::SyncEngine;
use super::handler::room_ws_handler;

/// Builds the sync listener's router.
pub fn router(engine: Arc<SyncEngine>) -> Router {
    Router::new()
        .fallback(room_ws_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Serves the sync router on `listener` until the process stops.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(listener: tokio::net::TcpListener, engine: Arc<SyncEngine>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "sync server listening");
    }
    axum::serve(listener, router(engine)).await
}
