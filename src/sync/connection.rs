//! Per-socket relay loop.
//!
//! Reads binary frames from the client into the engine and writes the
//! frames the engine queues for this client back out, until either side
//! goes away.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::engine::SyncEngine;

/// Runs the read/write loop for one client of `room_id`.
pub async fn run_connection(socket: WebSocket, engine: Arc<SyncEngine>, room_id: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut sub = engine.join(&room_id).await;
    let client_id = sub.client_id;

    loop {
        tokio::select! {
            // Incoming frame from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Binary(frame))) => {
                        engine.publish(&sub.room, client_id, frame).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(room = %room_id, client_id, error = %e, "sync socket error");
                        break;
                    }
                    // Text frames are not part of the protocol; pings are
                    // answered by the socket itself.
                    Some(Ok(_)) => {}
                }
            }
            // Frame queued by the room
            frame = sub.frames.recv() => {
                match frame {
                    Some(frame) => {
                        if ws_tx.send(Message::Binary(frame)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    engine.leave(&sub.room, client_id).await;
    tracing::debug!(room = %room_id, client_id, "sync connection closed");
}
