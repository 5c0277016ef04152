//! Realtime document sync: a relay of opaque binary frames between the
//! clients editing the same room.
//!
//! One [`SyncEngine`] serves both the dedicated sync listener (room taken
//! from the request path) and `GET /share/ws/{room}` on the API listener.

pub mod connection;
pub mod engine;
pub mod handler;
pub mod protocol;
pub mod server;

pub use engine::{DEFAULT_ROOM, DocumentSource, SyncEngine};
