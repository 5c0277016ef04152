//! Domain layer: identifiers, metadata records and document rules.
//!
//! This module contains the server-side domain model: type-safe ids for
//! users, knowledge bases and files, the metadata records persisted by
//! [`crate::storage::MetadataStore`], name validation, and the Markdown
//! image-link rewriting applied when documents cross the API boundary.

pub mod ids;
pub mod markdown;
pub mod models;
pub mod naming;

pub use ids::{FileId, IndexId, UserId};
pub use models::{KbFile, KnowledgeBase, RecycleEntry, ShareFile, User};
