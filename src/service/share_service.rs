//! Password-protected file shares and their live sync rooms.
//!
//! Sharing copies the file directory into a snapshot. Visitors read the
//! snapshot with the share password; the sync room named after the share
//! id is seeded from it and is closed when the share is deleted.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::domain::markdown::to_web_links;
use crate::domain::{FileId, ShareFile, UserId};
use crate::error::ApiError;
use crate::storage::files::SHARE_SEGMENT;
use crate::storage::{FileStore, MetadataStore};
use crate::sync::{DocumentSource, SyncEngine};

/// Length of generated share passwords.
pub const SHARE_PASSWORD_LEN: usize = 16;

fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Reads share snapshots with image links pointing at the snapshot images.
#[derive(Debug, Clone)]
pub struct ShareSnapshots {
    store: Arc<dyn MetadataStore>,
    files: FileStore,
    image_server_url: String,
}

impl ShareSnapshots {
    /// Creates a new `ShareSnapshots`.
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>, files: FileStore, image_server_url: impl Into<String>) -> Self {
        Self {
            store,
            files,
            image_server_url: image_server_url.into(),
        }
    }

    /// Loads a share and its Markdown.
    ///
    /// # Errors
    ///
    /// [`ApiError::ShareNotFound`] if the share or its snapshot is missing.
    pub async fn load(&self, share_id: FileId) -> Result<(ShareFile, String), ApiError> {
        let share = self
            .store
            .share_by_id(share_id)
            .await?
            .ok_or(ApiError::ShareNotFound)?;
        let content = match self.files.read_snapshot(share_id, &share.name).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ApiError::ShareNotFound),
            Err(e) => return Err(e.into()),
        };
        let content = to_web_links(
            &content,
            &self.image_server_url,
            SHARE_SEGMENT,
            &share_id.to_string(),
        )
        .into_owned();
        Ok((share, content))
    }
}

#[async_trait]
impl DocumentSource for ShareSnapshots {
    async fn initial_content(&self, room: &str) -> Option<String> {
        let share_id = FileId::from_str(room).ok()?;
        match self.load(share_id).await {
            Ok((_, content)) => Some(content),
            Err(e) => {
                tracing::debug!(room, error = %e, "room not backed by a share");
                None
            }
        }
    }
}

/// Share operations.
#[derive(Debug, Clone)]
pub struct ShareService {
    store: Arc<dyn MetadataStore>,
    files: FileStore,
    snapshots: Arc<ShareSnapshots>,
    sync: Arc<SyncEngine>,
}

impl ShareService {
    /// Creates a new `ShareService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn MetadataStore>,
        files: FileStore,
        snapshots: Arc<ShareSnapshots>,
        sync: Arc<SyncEngine>,
    ) -> Self {
        Self {
            store,
            files,
            snapshots,
            sync,
        }
    }

    async fn owned_share(&self, user_id: UserId, share_id: FileId) -> Result<Option<ShareFile>, ApiError> {
        Ok(self
            .store
            .share_by_id(share_id)
            .await?
            .filter(|share| share.user_id == user_id))
    }

    /// Shares one of the caller's files under a fresh password.
    ///
    /// # Errors
    ///
    /// [`ApiError::FileNotFound`] if the file is not the caller's,
    /// [`ApiError::ShareExists`] if it is already shared.
    pub async fn create(&self, user_id: UserId, file_id: FileId) -> Result<ShareFile, ApiError> {
        let file = self
            .store
            .file_by_id(file_id)
            .await?
            .filter(|file| file.user_id == user_id)
            .ok_or(ApiError::FileNotFound)?;

        let share = ShareFile {
            id: file.id,
            index_id: file.index_id,
            user_id,
            name: file.name,
            password: generate_password(),
            created_at: Utc::now(),
        };
        self.store.insert_share(&share).await?;

        if let Err(e) = self
            .files
            .create_snapshot(share.index_id, file_id, share.id)
            .await
        {
            let _ = self.store.delete_share(share.id).await;
            return Err(e.into());
        }

        tracing::info!(share_id = %share.id, %user_id, "file shared");
        Ok(share)
    }

    /// Withdraws a share, removing its snapshot and closing its sync room.
    ///
    /// # Errors
    ///
    /// [`ApiError::ShareNotFound`] if it is not the caller's.
    pub async fn delete(&self, user_id: UserId, share_id: FileId) -> Result<(), ApiError> {
        self.owned_share(user_id, share_id)
            .await?
            .ok_or(ApiError::ShareNotFound)?;
        self.store.delete_share(share_id).await?;
        self.files.remove_snapshot(share_id).await?;
        let closed = self.sync.close_room(&share_id.to_string()).await;
        tracing::info!(%share_id, room_closed = closed, "share deleted");
        Ok(())
    }

    /// Whether the caller has a share with this id.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    pub async fn exists(&self, user_id: UserId, share_id: FileId) -> Result<bool, ApiError> {
        Ok(self.owned_share(user_id, share_id).await?.is_some())
    }

    /// The caller's shares, newest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<ShareFile>, ApiError> {
        self.store.shares_of(user_id).await
    }

    /// Reads a shared document. The password is the only share-level check;
    /// the caller must merely be signed in, which the handler enforces.
    ///
    /// # Errors
    ///
    /// [`ApiError::ShareNotFound`] or [`ApiError::WrongSharePassword`].
    pub async fn read(&self, share_id: FileId, password: &str) -> Result<(ShareFile, String), ApiError> {
        let (share, content) = self.snapshots.load(share_id).await?;
        if share.password != password {
            tracing::debug!(%share_id, "share password rejected");
            return Err(ApiError::WrongSharePassword);
        }
        Ok((share, content))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{IndexId, KbFile, KnowledgeBase};
    use crate::storage::MemoryStore;

    const PREFIX: &str = "http://img.test/images";

    struct Fixture {
        _dir: tempfile::TempDir,
        files: FileStore,
        shares: ShareService,
        sync: Arc<SyncEngine>,
        user: UserId,
        file: KbFile,
    }

    async fn fixture() -> Fixture {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let files = FileStore::new(dir.path());
        let _ = files.ensure_layout().await;
        let store: Arc<dyn MetadataStore> = Arc::new(MemoryStore::new());

        let user = UserId::new();
        let now = Utc::now();
        let index = KnowledgeBase {
            id: IndexId::new(),
            user_id: user,
            name: "kb".to_string(),
            created_at: now,
            updated_at: now,
        };
        let file = KbFile {
            id: FileId::new(),
            index_id: index.id,
            user_id: user,
            name: "doc".to_string(),
            created_at: now,
            updated_at: now,
        };
        let (Ok(()), Ok(())) = (store.insert_index(&index).await, store.insert_file(&file).await) else {
            panic!("seeding failed");
        };
        let Ok(()) = files
            .write_document(index.id, file.id, "doc", b"# Doc\n![i](images/1_i.png)")
            .await
        else {
            panic!("write failed");
        };

        let snapshots = Arc::new(ShareSnapshots::new(Arc::clone(&store), files.clone(), PREFIX));
        let source: Arc<dyn DocumentSource> = Arc::clone(&snapshots) as Arc<dyn DocumentSource>;
        let sync = Arc::new(SyncEngine::new(8, Some(source)));
        Fixture {
            _dir: dir,
            shares: ShareService::new(store, files.clone(), snapshots, Arc::clone(&sync)),
            files,
            sync,
            user,
            file,
        }
    }

    #[test]
    fn passwords_are_alphanumeric() {
        let pw = generate_password();
        assert_eq!(pw.len(), SHARE_PASSWORD_LEN);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn create_read_delete() {
        let fx = fixture().await;
        assert!(matches!(
            fx.shares.create(UserId::new(), fx.file.id).await,
            Err(ApiError::FileNotFound)
        ));
        let Ok(share) = fx.shares.create(fx.user, fx.file.id).await else {
            panic!("create failed");
        };
        assert_eq!(share.id, fx.file.id);
        assert!(matches!(fx.shares.create(fx.user, fx.file.id).await, Err(ApiError::ShareExists)));
        assert!(matches!(fx.shares.exists(fx.user, share.id).await, Ok(true)));
        assert!(matches!(fx.shares.exists(UserId::new(), share.id).await, Ok(false)));
        assert!(matches!(fx.shares.list(fx.user).await, Ok(v) if v.len() == 1));

        assert!(matches!(
            fx.shares.read(share.id, "wrong").await,
            Err(ApiError::WrongSharePassword)
        ));
        let Ok((_, content)) = fx.shares.read(share.id, &share.password).await else {
            panic!("read failed");
        };
        assert_eq!(content, format!("# Doc\n![i]({PREFIX}/share/{}/1_i.png)", share.id));

        assert!(matches!(
            fx.shares.delete(UserId::new(), share.id).await,
            Err(ApiError::ShareNotFound)
        ));
        assert!(fx.shares.delete(fx.user, share.id).await.is_ok());
        assert!(matches!(fx.shares.read(share.id, &share.password).await, Err(ApiError::ShareNotFound)));
        assert!(fx.files.read_snapshot(share.id, "doc").await.is_err());
    }

    #[tokio::test]
    async fn rooms_are_seeded_from_snapshots_and_closed_on_delete() {
        let fx = fixture().await;
        let Ok(share) = fx.shares.create(fx.user, fx.file.id).await else {
            panic!("create failed");
        };
        let mut sub = fx.sync.join(&share.id.to_string()).await;
        let expected = format!("# Doc\n![i]({PREFIX}/share/{}/1_i.png)", share.id);
        assert_eq!(
            sub.frames.recv().await,
            Some(crate::sync::protocol::seed_frame(&expected))
        );

        assert!(fx.shares.delete(fx.user, share.id).await.is_ok());
        assert_eq!(sub.frames.recv().await, None);
        assert_eq!(fx.sync.room_count().await, 0);
    }
}
