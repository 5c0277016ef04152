//! Recycle bin DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{FileId, IndexId, RecycleEntry};

/// Request body for restoring or deleting a recycled file.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecycledFileRequest {
    /// Recycled file id.
    pub kb_file_id: FileId,
    /// Knowledge base the file came from.
    pub index_id: IndexId,
}

/// A recycle bin entry as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecycledFileDto {
    /// File id.
    pub kb_file_id: FileId,
    /// Knowledge base the file came from.
    pub index_id: IndexId,
    /// Name at the time of recycling.
    pub kb_file_name: String,
    /// When the file was recycled.
    pub deleted_at: DateTime<Utc>,
}

impl From<RecycleEntry> for RecycledFileDto {
    fn from(entry: RecycleEntry) -> Self {
        Self {
            kb_file_id: entry.file_id,
            index_id: entry.index_id,
            kb_file_name: entry.name,
            deleted_at: entry.deleted_at,
        }
    }
}

/// Number of recycle entries removed by a clear or cleanup.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurgedDto {
    /// Entries permanently deleted.
    pub purged: usize,
}
