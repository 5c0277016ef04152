//! # gcnote
//!
//! Knowledge-base note service: per-user knowledge bases of Markdown
//! documents with embedded images, a recycle bin, password-protected
//! shares, and a realtime sync relay for editing shared documents live.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)          ── AuthUser (auth/)
//!     ├── Sync Handlers (sync/)         ── SyncEngine rooms
//!     │
//!     ├── Services (service/)
//!     │
//!     ├── MetadataStore (storage/)      ── memory or PostgreSQL
//!     └── FileStore (storage/)          ── documents, images, snapshots
//! ```
//!
//! The client route table and its login guard live in [`navigation`] and
//! are served over `GET /client/resolve`.

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod navigation;
pub mod service;
pub mod storage;
pub mod sync;
