//! In-memory [`MetadataStore`] used when persistence is disabled.
//!
//! All tables sit behind one [`tokio::sync::RwLock`], so every operation,
//! including the moves in and out of the recycle bin, is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{MetadataStore, RecentOrder};
use crate::domain::{FileId, IndexId, KbFile, KnowledgeBase, RecycleEntry, ShareFile, User, UserId};
use crate::error::ApiError;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    indexes: HashMap<IndexId, KnowledgeBase>,
    files: HashMap<FileId, KbFile>,
    recycle: HashMap<FileId, RecycleEntry>,
    shares: HashMap<FileId, ShareFile>,
}

impl Tables {
    fn file_name_taken(&self, index_id: IndexId, name: &str, except: Option<FileId>) -> bool {
        self.files
            .values()
            .any(|f| f.index_id == index_id && f.name == name && Some(f.id) != except)
    }
}

/// Process-local metadata store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(key);
    items
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(ApiError::UserExists);
        }
        if t.users.values().any(|u| u.email == user.email) {
            return Err(ApiError::EmailExists);
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, ApiError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<User>, ApiError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn rename_user(
        &self,
        id: UserId,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == username && u.id != id) {
            return Err(ApiError::UserExists);
        }
        let user = t
            .users
            .get_mut(&id)
            .ok_or_else(|| ApiError::RecordNotFound(format!("user {id}")))?;
        user.username = username.to_string();
        user.updated_at = now;
        Ok(())
    }

    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        let user = t
            .users
            .get_mut(&id)
            .ok_or_else(|| ApiError::RecordNotFound(format!("user {id}")))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = now;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, ApiError> {
        Ok(self.tables.write().await.users.remove(&id).is_some())
    }

    async fn insert_index(&self, index: &KnowledgeBase) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        if t
            .indexes
            .values()
            .any(|i| i.user_id == index.user_id && i.name == index.name)
        {
            return Err(ApiError::IndexExists);
        }
        t.indexes.insert(index.id, index.clone());
        Ok(())
    }

    async fn index_by_id(&self, id: IndexId) -> Result<Option<KnowledgeBase>, ApiError> {
        Ok(self.tables.read().await.indexes.get(&id).cloned())
    }

    async fn indexes_of(&self, user_id: UserId) -> Result<Vec<KnowledgeBase>, ApiError> {
        let t = self.tables.read().await;
        let items: Vec<KnowledgeBase> = t
            .indexes
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_by(items, |i| i.created_at))
    }

    async fn rename_index(
        &self,
        id: IndexId,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        let owner = t.indexes.get(&id).ok_or(ApiError::IndexNotFound)?.user_id;
        if t
            .indexes
            .values()
            .any(|i| i.user_id == owner && i.name == name && i.id != id)
        {
            return Err(ApiError::IndexExists);
        }
        if let Some(index) = t.indexes.get_mut(&id) {
            index.name = name.to_string();
            index.updated_at = now;
        }
        Ok(())
    }

    async fn delete_index(&self, id: IndexId) -> Result<Vec<KbFile>, ApiError> {
        let mut t = self.tables.write().await;
        t.indexes.remove(&id).ok_or(ApiError::IndexNotFound)?;
        let removed: Vec<FileId> = t
            .files
            .values()
            .filter(|f| f.index_id == id)
            .map(|f| f.id)
            .collect();
        Ok(removed
            .into_iter()
            .filter_map(|file_id| t.files.remove(&file_id))
            .collect())
    }

    async fn insert_file(&self, file: &KbFile) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        if t.file_name_taken(file.index_id, &file.name, None) {
            return Err(ApiError::FileExists);
        }
        t.files.insert(file.id, file.clone());
        Ok(())
    }

    async fn file_by_id(&self, id: FileId) -> Result<Option<KbFile>, ApiError> {
        Ok(self.tables.read().await.files.get(&id).cloned())
    }

    async fn files_in(&self, index_id: IndexId) -> Result<Vec<KbFile>, ApiError> {
        let t = self.tables.read().await;
        let items: Vec<KbFile> = t
            .files
            .values()
            .filter(|f| f.index_id == index_id)
            .cloned()
            .collect();
        Ok(sorted_by(items, |f| f.created_at))
    }

    async fn rename_file(&self, id: FileId, name: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        let index_id = t.files.get(&id).ok_or(ApiError::FileNotFound)?.index_id;
        if t.file_name_taken(index_id, name, Some(id)) {
            return Err(ApiError::FileExists);
        }
        if let Some(file) = t.files.get_mut(&id) {
            file.name = name.to_string();
            file.updated_at = now;
        }
        Ok(())
    }

    async fn touch_file(&self, id: FileId, now: DateTime<Utc>) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        let file = t.files.get_mut(&id).ok_or(ApiError::FileNotFound)?;
        file.updated_at = now;
        Ok(())
    }

    async fn recent_files(
        &self,
        user_id: UserId,
        order: RecentOrder,
        limit: usize,
    ) -> Result<Vec<KbFile>, ApiError> {
        let t = self.tables.read().await;
        let mut items: Vec<KbFile> = t
            .files
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        match order {
            RecentOrder::Modified => items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            RecentOrder::Created => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        items.truncate(limit);
        Ok(items)
    }

    async fn recycle_file(&self, id: FileId, now: DateTime<Utc>) -> Result<RecycleEntry, ApiError> {
        let mut t = self.tables.write().await;
        let file = t.files.remove(&id).ok_or(ApiError::FileNotFound)?;
        let entry = RecycleEntry::from_file(&file, now);
        t.recycle.insert(id, entry.clone());
        Ok(entry)
    }

    async fn recycle_entry(&self, id: FileId) -> Result<Option<RecycleEntry>, ApiError> {
        Ok(self.tables.read().await.recycle.get(&id).cloned())
    }

    async fn recycled_of(&self, user_id: UserId) -> Result<Vec<RecycleEntry>, ApiError> {
        let t = self.tables.read().await;
        let mut items: Vec<RecycleEntry> = t
            .recycle
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(items)
    }

    async fn recycled_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<RecycleEntry>, ApiError> {
        let t = self.tables.read().await;
        let items: Vec<RecycleEntry> = t
            .recycle
            .values()
            .filter(|r| r.deleted_at < cutoff)
            .cloned()
            .collect();
        Ok(sorted_by(items, |r| r.deleted_at))
    }

    async fn restore_file(&self, id: FileId, now: DateTime<Utc>) -> Result<KbFile, ApiError> {
        let mut t = self.tables.write().await;
        let entry = t.recycle.get(&id).ok_or(ApiError::RecycledFileNotFound)?;
        if !t.indexes.contains_key(&entry.index_id) {
            return Err(ApiError::IndexNotFound);
        }
        if t.file_name_taken(entry.index_id, &entry.name, None) {
            return Err(ApiError::FileExists);
        }
        let file = entry.restore(now);
        t.recycle.remove(&id);
        t.files.insert(id, file.clone());
        Ok(file)
    }

    async fn delete_recycled(&self, id: FileId) -> Result<bool, ApiError> {
        Ok(self.tables.write().await.recycle.remove(&id).is_some())
    }

    async fn insert_share(&self, share: &ShareFile) -> Result<(), ApiError> {
        let mut t = self.tables.write().await;
        if t.shares.contains_key(&share.id) {
            return Err(ApiError::ShareExists);
        }
        t.shares.insert(share.id, share.clone());
        Ok(())
    }

    async fn share_by_id(&self, id: FileId) -> Result<Option<ShareFile>, ApiError> {
        Ok(self.tables.read().await.shares.get(&id).cloned())
    }

    async fn shares_of(&self, user_id: UserId) -> Result<Vec<ShareFile>, ApiError> {
        let t = self.tables.read().await;
        let mut items: Vec<ShareFile> = t
            .shares
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn delete_share(&self, id: FileId) -> Result<bool, ApiError> {
        Ok(self.tables.write().await.shares.remove(&id).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn user(name: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            username: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn index(owner: UserId, name: &str) -> KnowledgeBase {
        let now = Utc::now();
        KnowledgeBase {
            id: IndexId::new(),
            user_id: owner,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn file(index: &KnowledgeBase, name: &str) -> KbFile {
        let now = Utc::now();
        KbFile {
            id: FileId::new(),
            index_id: index.id,
            user_id: index.user_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn user_uniqueness() {
        let store = MemoryStore::new();
        assert!(store.insert_user(&user("ann", "ann@x.io")).await.is_ok());
        assert!(matches!(
            store.insert_user(&user("ann", "other@x.io")).await,
            Err(ApiError::UserExists)
        ));
        assert!(matches!(
            store.insert_user(&user("bob", "ann@x.io")).await,
            Err(ApiError::EmailExists)
        ));

        let bob = user("bob", "bob@x.io");
        assert!(store.insert_user(&bob).await.is_ok());
        assert!(matches!(
            store.rename_user(bob.id, "ann", Utc::now()).await,
            Err(ApiError::UserExists)
        ));
        assert!(store.rename_user(bob.id, "robert", Utc::now()).await.is_ok());
        let Ok(Some(found)) = store.user_by_name("robert").await else {
            panic!("renamed user should be found");
        };
        assert_eq!(found.id, bob.id);
    }

    #[tokio::test]
    async fn index_names_are_unique_per_owner() {
        let store = MemoryStore::new();
        let a = UserId::new();
        let b = UserId::new();
        assert!(store.insert_index(&index(a, "notes")).await.is_ok());
        assert!(store.insert_index(&index(b, "notes")).await.is_ok());
        assert!(matches!(
            store.insert_index(&index(a, "notes")).await,
            Err(ApiError::IndexExists)
        ));
    }

    #[tokio::test]
    async fn delete_index_drops_its_files() {
        let store = MemoryStore::new();
        let kb = index(UserId::new(), "kb");
        let _ = store.insert_index(&kb).await;
        let _ = store.insert_file(&file(&kb, "a")).await;
        let _ = store.insert_file(&file(&kb, "b")).await;

        let Ok(removed) = store.delete_index(kb.id).await else {
            panic!("delete should succeed");
        };
        assert_eq!(removed.len(), 2);
        assert!(matches!(store.files_in(kb.id).await, Ok(v) if v.is_empty()));
        assert!(matches!(
            store.delete_index(kb.id).await,
            Err(ApiError::IndexNotFound)
        ));
    }

    #[tokio::test]
    async fn recycle_round_trip() {
        let store = MemoryStore::new();
        let kb = index(UserId::new(), "kb");
        let f = file(&kb, "draft");
        let _ = store.insert_index(&kb).await;
        let _ = store.insert_file(&f).await;

        let Ok(entry) = store.recycle_file(f.id, Utc::now()).await else {
            panic!("recycle failed");
        };
        assert_eq!(entry.file_id, f.id);
        assert!(matches!(store.file_by_id(f.id).await, Ok(None)));

        // A new file takes the old name while the original is recycled.
        let clash = file(&kb, "draft");
        let _ = store.insert_file(&clash).await;
        assert!(matches!(
            store.restore_file(f.id, Utc::now()).await,
            Err(ApiError::FileExists)
        ));

        let _ = store.recycle_file(clash.id, Utc::now()).await;
        let Ok(restored) = store.restore_file(f.id, Utc::now()).await else {
            panic!("restore failed");
        };
        assert_eq!(restored.id, f.id);
        assert!(matches!(store.recycle_entry(f.id).await, Ok(None)));
    }

    #[tokio::test]
    async fn restore_needs_the_index() {
        let store = MemoryStore::new();
        let kb = index(UserId::new(), "kb");
        let f = file(&kb, "x");
        let _ = store.insert_index(&kb).await;
        let _ = store.insert_file(&f).await;
        let _ = store.recycle_file(f.id, Utc::now()).await;
        let _ = store.delete_index(kb.id).await;

        assert!(matches!(
            store.restore_file(f.id, Utc::now()).await,
            Err(ApiError::IndexNotFound)
        ));
        assert!(matches!(
            store.restore_file(FileId::new(), Utc::now()).await,
            Err(ApiError::RecycledFileNotFound)
        ));
    }

    #[tokio::test]
    async fn recent_files_order_and_limit() {
        let store = MemoryStore::new();
        let kb = index(UserId::new(), "kb");
        let _ = store.insert_index(&kb).await;
        let base = Utc::now();
        for i in 0..5 {
            let mut f = file(&kb, &format!("f{i}"));
            f.created_at = base + Duration::seconds(i);
            f.updated_at = base - Duration::seconds(i);
            let _ = store.insert_file(&f).await;
        }

        let Ok(created) = store.recent_files(kb.user_id, RecentOrder::Created, 3).await else {
            panic!("listing failed");
        };
        let names: Vec<_> = created.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["f4", "f3", "f2"]);

        let Ok(modified) = store.recent_files(kb.user_id, RecentOrder::Modified, 2).await else {
            panic!("listing failed");
        };
        let names: Vec<_> = modified.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["f0", "f1"]);
    }

    #[tokio::test]
    async fn recycled_before_uses_cutoff() {
        let store = MemoryStore::new();
        let kb = index(UserId::new(), "kb");
        let old = file(&kb, "old");
        let new = file(&kb, "new");
        let _ = store.insert_index(&kb).await;
        let _ = store.insert_file(&old).await;
        let _ = store.insert_file(&new).await;
        let now = Utc::now();
        let _ = store.recycle_file(old.id, now - Duration::days(40)).await;
        let _ = store.recycle_file(new.id, now).await;

        let Ok(expired) = store.recycled_before(now - Duration::days(30)).await else {
            panic!("listing failed");
        };
        assert_eq!(expired.len(), 1);
        assert!(expired.iter().all(|e| e.file_id == old.id));
    }

    #[tokio::test]
    async fn shares_are_unique_per_file() {
        let store = MemoryStore::new();
        let share = ShareFile {
            id: FileId::new(),
            index_id: IndexId::new(),
            user_id: UserId::new(),
            name: "doc".to_string(),
            password: "p".repeat(16),
            created_at: Utc::now(),
        };
        assert!(store.insert_share(&share).await.is_ok());
        assert!(matches!(
            store.insert_share(&share).await,
            Err(ApiError::ShareExists)
        ));
        assert!(matches!(store.delete_share(share.id).await, Ok(true)));
        assert!(matches!(store.delete_share(share.id).await, Ok(false)));
    }
}
