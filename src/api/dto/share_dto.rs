//! Share DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{FileId, IndexId, ShareFile};

/// Request body for `POST /share/create`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateShareRequest {
    /// File to share.
    pub kb_file_id: FileId,
}

/// Request body for `POST /share/delete`; query of `GET /share/exist`.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShareIdRequest {
    /// Share id.
    pub share_file_id: FileId,
}

/// Request body for `POST /share/read`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReadShareRequest {
    /// Share id.
    pub share_file_id: FileId,
    /// Access password.
    pub password: String,
}

/// Response of `POST /share/create`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedShareDto {
    /// Share id.
    pub share_file_id: FileId,
    /// Access password.
    pub password: String,
}

/// Response of `GET /share/exist`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShareExistsDto {
    /// Share id asked about.
    pub share_file_id: FileId,
    /// Whether the caller has that share.
    pub exist: bool,
}

/// A share as listed for its owner.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShareDto {
    /// Share id (also the source file id).
    pub share_file_id: FileId,
    /// Knowledge base of the source file.
    pub index_id: IndexId,
    /// File name at share time.
    pub file_name: String,
    /// Access password.
    pub password: String,
    /// Share time.
    pub created_at: DateTime<Utc>,
}

impl From<ShareFile> for ShareDto {
    fn from(share: ShareFile) -> Self {
        Self {
            share_file_id: share.id,
            index_id: share.index_id,
            file_name: share.name,
            password: share.password,
            created_at: share.created_at,
        }
    }
}

/// A shared document as read by a visitor.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SharedContentDto {
    /// Share id.
    pub share_file_id: FileId,
    /// File name.
    pub file_name: String,
    /// Markdown with image links pointing at the snapshot images.
    pub content: String,
}
