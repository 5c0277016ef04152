//! Storage layer: metadata records and on-disk document trees.
//!
//! Metadata goes through the [`MetadataStore`] trait, implemented by
//! [`MemoryStore`] (default, and used by tests) and [`PostgresStore`].
//! Document bodies, images, recycled files and share snapshots live on
//! disk under [`FileStore`].

pub mod files;
pub mod memory;
pub mod postgres;

pub use files::FileStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{FileId, IndexId, KbFile, KnowledgeBase, RecycleEntry, ShareFile, User, UserId};
use crate::error::ApiError;

/// Ordering for the recent-documents listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecentOrder {
    /// Most recently modified first.
    Modified,
    /// Most recently created first.
    Created,
}

impl std::str::FromStr for RecentOrder {
    type Err = ApiError;

    /// Parses the `mode` of the recent-documents request.
    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "modified" => Ok(Self::Modified),
            "created" => Ok(Self::Created),
            other => Err(ApiError::InvalidParams(format!("unknown mode `{other}`"))),
        }
    }
}

/// Persistence of users, knowledge bases, files, recycle entries and
/// shares.
///
/// Uniqueness rules are enforced by the store and reported as the
/// matching conflict variant of [`ApiError`]. Moves between live files
/// and the recycle bin are atomic.
#[async_trait]
pub trait MetadataStore: Send + Sync + std::fmt::Debug {
    // ── Users ───────────────────────────────────────────────────────────

    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// [`ApiError::UserExists`] or [`ApiError::EmailExists`] on conflicts.
    async fn insert_user(&self, user: &User) -> Result<(), ApiError>;

    /// Looks up a user by id.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, ApiError>;

    /// Looks up a user by login name.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn user_by_name(&self, username: &str) -> Result<Option<User>, ApiError>;

    /// Changes a user's login name.
    ///
    /// # Errors
    ///
    /// [`ApiError::UserExists`] if taken, [`ApiError::RecordNotFound`] if
    /// the user is gone.
    async fn rename_user(&self, id: UserId, username: &str, now: DateTime<Utc>)
    -> Result<(), ApiError>;

    /// Replaces a user's password hash.
    ///
    /// # Errors
    ///
    /// [`ApiError::RecordNotFound`] if the user is gone.
    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError>;

    /// Deletes a user record. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn delete_user(&self, id: UserId) -> Result<bool, ApiError>;

    // ── Knowledge bases ─────────────────────────────────────────────────

    /// Inserts a knowledge base.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexExists`] if the owner already has one with that name.
    async fn insert_index(&self, index: &KnowledgeBase) -> Result<(), ApiError>;

    /// Looks up a knowledge base by id.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn index_by_id(&self, id: IndexId) -> Result<Option<KnowledgeBase>, ApiError>;

    /// All knowledge bases of a user, oldest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn indexes_of(&self, user_id: UserId) -> Result<Vec<KnowledgeBase>, ApiError>;

    /// Renames a knowledge base.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexExists`] on a name clash, [`ApiError::IndexNotFound`]
    /// if it is gone.
    async fn rename_index(&self, id: IndexId, name: &str, now: DateTime<Utc>)
    -> Result<(), ApiError>;

    /// Deletes a knowledge base and its live file records, returning the
    /// removed files.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexNotFound`] if it is gone.
    async fn delete_index(&self, id: IndexId) -> Result<Vec<KbFile>, ApiError>;

    // ── Files ───────────────────────────────────────────────────────────

    /// Inserts a file record.
    ///
    /// # Errors
    ///
    /// [`ApiError::FileExists`] if the knowledge base already has a file
    /// with that name.
    async fn insert_file(&self, file: &KbFile) -> Result<(), ApiError>;

    /// Looks up a live file by id.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn file_by_id(&self, id: FileId) -> Result<Option<KbFile>, ApiError>;

    /// All live files of a knowledge base, oldest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn files_in(&self, index_id: IndexId) -> Result<Vec<KbFile>, ApiError>;

    /// Renames a file.
    ///
    /// # Errors
    ///
    /// [`ApiError::FileExists`] on a name clash, [`ApiError::FileNotFound`]
    /// if it is gone.
    async fn rename_file(&self, id: FileId, name: &str, now: DateTime<Utc>) -> Result<(), ApiError>;

    /// Bumps a file's modification time.
    ///
    /// # Errors
    ///
    /// [`ApiError::FileNotFound`] if it is gone.
    async fn touch_file(&self, id: FileId, now: DateTime<Utc>) -> Result<(), ApiError>;

    /// A user's newest files in `order`, at most `limit`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn recent_files(
        &self,
        user_id: UserId,
        order: RecentOrder,
        limit: usize,
    ) -> Result<Vec<KbFile>, ApiError>;

    // ── Recycle bin ─────────────────────────────────────────────────────

    /// Atomically moves a live file record into the recycle bin.
    ///
    /// # Errors
    ///
    /// [`ApiError::FileNotFound`] if the file is not live.
    async fn recycle_file(&self, id: FileId, now: DateTime<Utc>) -> Result<RecycleEntry, ApiError>;

    /// Looks up a recycle entry by file id.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn recycle_entry(&self, id: FileId) -> Result<Option<RecycleEntry>, ApiError>;

    /// A user's recycle entries, most recently deleted first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn recycled_of(&self, user_id: UserId) -> Result<Vec<RecycleEntry>, ApiError>;

    /// Entries deleted before `cutoff`, across all users.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn recycled_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<RecycleEntry>, ApiError>;

    /// Atomically moves a recycle entry back to a live file record.
    ///
    /// # Errors
    ///
    /// [`ApiError::RecycledFileNotFound`] if there is no entry,
    /// [`ApiError::IndexNotFound`] if its knowledge base is gone,
    /// [`ApiError::FileExists`] on a name clash.
    async fn restore_file(&self, id: FileId, now: DateTime<Utc>) -> Result<KbFile, ApiError>;

    /// Permanently deletes a recycle entry. Returns `false` if it did not
    /// exist.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn delete_recycled(&self, id: FileId) -> Result<bool, ApiError>;

    // ── Shares ──────────────────────────────────────────────────────────

    /// Inserts a share.
    ///
    /// # Errors
    ///
    /// [`ApiError::ShareExists`] if the file is already shared.
    async fn insert_share(&self, share: &ShareFile) -> Result<(), ApiError>;

    /// Looks up a share by id.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn share_by_id(&self, id: FileId) -> Result<Option<ShareFile>, ApiError>;

    /// All shares of a user, newest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn shares_of(&self, user_id: UserId) -> Result<Vec<ShareFile>, ApiError>;

    /// Deletes a share. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    async fn delete_share(&self, id: FileId) -> Result<bool, ApiError>;
}
