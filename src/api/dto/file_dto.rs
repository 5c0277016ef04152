//! Knowledge base file and image DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{FileId, IndexId, KbFile};

/// Request body for `POST /index/create_file`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateFileRequest {
    /// Target knowledge base.
    pub index_id: IndexId,
    /// File name without extension.
    pub kb_file_name: String,
}

/// Request body for requests addressing one file.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FileRequest {
    /// Knowledge base of the file.
    pub index_id: IndexId,
    /// File id.
    pub kb_file_id: FileId,
}

/// Request body for `POST /index/rename_file`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RenameFileRequest {
    /// Knowledge base of the file.
    pub index_id: IndexId,
    /// File id.
    pub kb_file_id: FileId,
    /// New name without extension.
    pub dest_kb_file_name: String,
}

/// Request body for `POST /index/search_file`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SearchFileRequest {
    /// Knowledge base to search.
    pub index_id: IndexId,
    /// Name (or, when fuzzy, part of a name) to look for.
    pub kb_file_name: String,
    /// Substring match instead of exact match.
    #[serde(default)]
    pub is_fuzzy_search: bool,
}

/// Request body for `POST /index/recent_docs`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecentDocsRequest {
    /// `modified` or `created`.
    pub mode: String,
}

/// A file as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileDto {
    /// File id.
    pub kb_file_id: FileId,
    /// Knowledge base of the file.
    pub index_id: IndexId,
    /// Name without extension.
    pub kb_file_name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl From<KbFile> for FileDto {
    fn from(file: KbFile) -> Self {
        Self {
            kb_file_id: file.id,
            index_id: file.index_id,
            kb_file_name: file.name,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

/// A file with its Markdown body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileContentDto {
    /// File metadata.
    #[serde(flatten)]
    pub file: FileDto,
    /// Markdown with image links pointing at the image endpoint.
    pub content: String,
}

/// Response of `POST /images/upload`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageUrlDto {
    /// Public URL of the stored image.
    pub url: String,
}

/// Multipart form of the upload endpoints, for the API documentation.
///
/// `kb_file_id` is required by `update_file` and the image upload, and
/// ignored by `add_file`.
#[derive(Debug, ToSchema)]
pub struct UploadFormDoc {
    /// Knowledge base id.
    pub index_id: IndexId,
    /// File id.
    pub kb_file_id: Option<FileId>,
    /// Uploaded file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
