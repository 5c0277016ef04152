//! Metadata records shared by the service and persistence layers.
//!
//! Document bodies never live in these records; they are stored on disk
//! by [`crate::storage::FileStore`] under paths derived from the ids.

use chrono::{DateTime, Utc};

use super::{FileId, IndexId, UserId};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    /// Account identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// bcrypt hash of `password + pepper`.
    pub password_hash: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last profile change.
    pub updated_at: DateTime<Utc>,
}

/// A knowledge base: a named notebook owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KnowledgeBase {
    /// Knowledge base identifier.
    pub id: IndexId,
    /// Owner.
    pub user_id: UserId,
    /// Display name, unique per owner.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last rename.
    pub updated_at: DateTime<Utc>,
}

/// A live Markdown file inside a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KbFile {
    /// File identifier.
    pub id: FileId,
    /// Knowledge base holding the file.
    pub index_id: IndexId,
    /// Owner (always the owner of the knowledge base).
    pub user_id: UserId,
    /// File name without the `.md` extension, unique per knowledge base.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last content change or rename.
    pub updated_at: DateTime<Utc>,
}

/// A file moved to the recycle bin.
///
/// Keeps the original file and knowledge base ids so the file can be
/// restored to where it came from.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RecycleEntry {
    /// Identifier of the recycled file.
    pub file_id: FileId,
    /// Knowledge base the file was recycled from.
    pub index_id: IndexId,
    /// Owner.
    pub user_id: UserId,
    /// File name at the time of recycling.
    pub name: String,
    /// Original creation time of the file.
    pub created_at: DateTime<Utc>,
    /// Time the file entered the recycle bin.
    pub deleted_at: DateTime<Utc>,
}

impl RecycleEntry {
    /// Builds the recycle record for `file`, recycled at `now`.
    #[must_use]
    pub fn from_file(file: &KbFile, now: DateTime<Utc>) -> Self {
        Self {
            file_id: file.id,
            index_id: file.index_id,
            user_id: file.user_id,
            name: file.name.clone(),
            created_at: file.created_at,
            deleted_at: now,
        }
    }

    /// Builds the live file record restored from this entry at `now`.
    #[must_use]
    pub fn restore(&self, now: DateTime<Utc>) -> KbFile {
        KbFile {
            id: self.file_id,
            index_id: self.index_id,
            user_id: self.user_id,
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

/// A password-protected snapshot of a file.
///
/// The share id is the id of the source file, so a file has at most one
/// share.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ShareFile {
    /// Share identifier (equal to the source file id).
    pub id: FileId,
    /// Knowledge base of the source file.
    pub index_id: IndexId,
    /// Owner.
    pub user_id: UserId,
    /// File name at share time.
    pub name: String,
    /// 16-character alphanumeric access password.
    pub password: String,
    /// Share time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycle_and_restore_keep_identity() {
        let created = Utc::now();
        let file = KbFile {
            id: FileId::new(),
            index_id: IndexId::new(),
            user_id: UserId::new(),
            name: "notes".to_string(),
            created_at: created,
            updated_at: created,
        };

        let later = Utc::now();
        let entry = RecycleEntry::from_file(&file, later);
        assert_eq!(entry.file_id, file.id);
        assert_eq!(entry.index_id, file.index_id);
        assert_eq!(entry.deleted_at, later);

        let restored = entry.restore(later);
        assert_eq!(restored.id, file.id);
        assert_eq!(restored.name, "notes");
        assert_eq!(restored.created_at, created);
        assert_eq!(restored.updated_at, later);
    }
}
