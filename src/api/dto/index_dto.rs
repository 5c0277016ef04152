//! Knowledge base DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{IndexId, KnowledgeBase};

/// Request body for `POST /index/create_index`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateIndexRequest {
    /// Knowledge base name.
    pub index_name: String,
}

/// Request body for requests addressing one knowledge base.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IndexRequest {
    /// Knowledge base id.
    pub index_id: IndexId,
}

/// Request body for `POST /index/rename_index`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RenameIndexRequest {
    /// Knowledge base id.
    pub index_id: IndexId,
    /// New name.
    pub dest_index_name: String,
}

/// A knowledge base as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IndexDto {
    /// Knowledge base id.
    pub index_id: IndexId,
    /// Name.
    pub index_name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last rename.
    pub updated_at: DateTime<Utc>,
}

impl From<KnowledgeBase> for IndexDto {
    fn from(index: KnowledgeBase) -> Self {
        Self {
            index_id: index.id,
            index_name: index.name,
            created_at: index.created_at,
            updated_at: index.updated_at,
        }
    }
}
