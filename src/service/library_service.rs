//! Knowledge bases, their Markdown files and the images embedded in them.
//!
//! Every operation takes the calling user and checks ownership before
//! touching anything: a knowledge base or file owned by someone else is
//! reported exactly like a missing one.

use std::io;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::markdown::{to_local_links, to_web_links};
use crate::domain::naming::{image_content_type, import_stem, is_image_name, is_plain_segment, is_valid_name};
use crate::domain::{FileId, IndexId, KbFile, KnowledgeBase, UserId};
use crate::error::ApiError;
use crate::storage::files::SHARE_SEGMENT;
use crate::storage::{FileStore, MetadataStore, RecentOrder};

/// Maximum number of entries in the recent-documents listing.
pub const RECENT_LIMIT: usize = 20;

/// Maps a missing file on disk to `missing`, anything else to an I/O error.
fn not_found_as(e: io::Error, missing: ApiError) -> ApiError {
    if e.kind() == io::ErrorKind::NotFound {
        missing
    } else {
        ApiError::Io(e)
    }
}

fn utf8(bytes: Vec<u8>) -> Result<String, ApiError> {
    String::from_utf8(bytes).map_err(|_| ApiError::InvalidParams("document is not valid UTF-8".to_string()))
}

/// A served image.
#[derive(Debug, Clone)]
pub struct Image {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// MIME type derived from the extension.
    pub content_type: &'static str,
}

/// Knowledge base and document operations.
#[derive(Debug, Clone)]
pub struct LibraryService {
    store: Arc<dyn MetadataStore>,
    files: FileStore,
    image_server_url: String,
}

impl LibraryService {
    /// Creates a new `LibraryService`. Image links handed to clients are
    /// prefixed with `image_server_url`.
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>, files: FileStore, image_server_url: impl Into<String>) -> Self {
        Self {
            store,
            files,
            image_server_url: image_server_url.into(),
        }
    }

    /// Loads a knowledge base owned by `user_id`.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexNotFound`] if it is missing or owned by someone else.
    pub async fn owned_index(&self, user_id: UserId, index_id: IndexId) -> Result<KnowledgeBase, ApiError> {
        self.store
            .index_by_id(index_id)
            .await?
            .filter(|index| index.user_id == user_id)
            .ok_or(ApiError::IndexNotFound)
    }

    /// Loads a file of an owned knowledge base.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexNotFound`] for a foreign knowledge base,
    /// [`ApiError::FileNotFound`] if the file is not live in it.
    pub async fn owned_file(&self, user_id: UserId, index_id: IndexId, file_id: FileId) -> Result<KbFile, ApiError> {
        self.owned_index(user_id, index_id).await?;
        self.store
            .file_by_id(file_id)
            .await?
            .filter(|file| file.index_id == index_id && file.user_id == user_id)
            .ok_or(ApiError::FileNotFound)
    }

    // ── Knowledge bases ─────────────────────────────────────────────────

    /// Creates a knowledge base and its directory.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidIndexName`] for a bad name, [`ApiError::IndexExists`]
    /// if the user already has one with that name.
    pub async fn create_index(&self, user_id: UserId, name: &str) -> Result<KnowledgeBase, ApiError> {
        if !is_valid_name(name) {
            return Err(ApiError::InvalidIndexName);
        }
        let now = Utc::now();
        let index = KnowledgeBase {
            id: IndexId::new(),
            user_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_index(&index).await?;

        if let Err(e) = self.files.create_index_dir(index.id).await {
            let _ = self.store.delete_index(index.id).await;
            return Err(e.into());
        }

        tracing::info!(index_id = %index.id, %user_id, "knowledge base created");
        Ok(index)
    }

    /// Deletes a knowledge base with all its live files.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexNotFound`] if it is not owned by the caller.
    pub async fn delete_index(&self, user_id: UserId, index_id: IndexId) -> Result<(), ApiError> {
        self.owned_index(user_id, index_id).await?;
        // Disk first: a failed removal leaves the records untouched.
        self.files.remove_index_dir(index_id).await?;
        let removed = self.store.delete_index(index_id).await?;
        tracing::info!(%index_id, files = removed.len(), "knowledge base deleted");
        Ok(())
    }

    /// Renames a knowledge base.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidIndexName`], [`ApiError::IndexNotFound`] or
    /// [`ApiError::IndexExists`].
    pub async fn rename_index(&self, user_id: UserId, index_id: IndexId, name: &str) -> Result<(), ApiError> {
        if !is_valid_name(name) {
            return Err(ApiError::InvalidIndexName);
        }
        let index = self.owned_index(user_id, index_id).await?;
        if index.name == name {
            return Ok(());
        }
        self.store.rename_index(index_id, name, Utc::now()).await
    }

    /// The caller's knowledge bases.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    pub async fn list_indexes(&self, user_id: UserId) -> Result<Vec<KnowledgeBase>, ApiError> {
        self.store.indexes_of(user_id).await
    }

    // ── Files ───────────────────────────────────────────────────────────

    async fn insert_document(
        &self,
        user_id: UserId,
        index_id: IndexId,
        name: &str,
        content: &str,
    ) -> Result<KbFile, ApiError> {
        if !is_valid_name(name) {
            return Err(ApiError::InvalidFileName);
        }
        self.owned_index(user_id, index_id).await?;

        let now = Utc::now();
        let file = KbFile {
            id: FileId::new(),
            index_id,
            user_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_file(&file).await?;

        if let Err(e) = self
            .files
            .write_document(index_id, file.id, name, content.as_bytes())
            .await
        {
            // Nothing was written to disk, so dropping the record undoes the insert.
            let _ = self.store.recycle_file(file.id, now).await;
            let _ = self.store.delete_recycled(file.id).await;
            return Err(e.into());
        }

        tracing::info!(file_id = %file.id, %index_id, "file created");
        Ok(file)
    }

    /// Creates an empty Markdown file.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidFileName`], [`ApiError::IndexNotFound`] or
    /// [`ApiError::FileExists`].
    pub async fn create_file(&self, user_id: UserId, index_id: IndexId, name: &str) -> Result<KbFile, ApiError> {
        self.insert_document(user_id, index_id, name, "").await
    }

    /// Imports an uploaded Markdown or text document, named after the
    /// upload's file stem.
    ///
    /// # Errors
    ///
    /// [`ApiError::ImportFailed`] for unsupported types or non-UTF-8
    /// content, plus the errors of [`LibraryService::create_file`].
    pub async fn import_file(
        &self,
        user_id: UserId,
        index_id: IndexId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<KbFile, ApiError> {
        let stem = import_stem(file_name)
            .ok_or_else(|| ApiError::ImportFailed(format!("unsupported file type: {file_name}")))?;
        let content =
            String::from_utf8(bytes).map_err(|_| ApiError::ImportFailed("content is not valid UTF-8".to_string()))?;
        self.insert_document(user_id, index_id, stem, &content).await
    }

    /// Live files of an owned knowledge base.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexNotFound`] if it is not owned by the caller.
    pub async fn list_files(&self, user_id: UserId, index_id: IndexId) -> Result<Vec<KbFile>, ApiError> {
        self.owned_index(user_id, index_id).await?;
        self.store.files_in(index_id).await
    }

    /// Reads a document with its image links pointing at the image endpoint.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexNotFound`] or [`ApiError::FileNotFound`].
    pub async fn read_file(
        &self,
        user_id: UserId,
        index_id: IndexId,
        file_id: FileId,
    ) -> Result<(KbFile, String), ApiError> {
        let file = self.owned_file(user_id, index_id, file_id).await?;
        let content = self
            .files
            .read_document(index_id, file_id, &file.name)
            .await
            .map_err(|e| not_found_as(e, ApiError::FileNotFound))?;
        let content = to_web_links(
            &content,
            &self.image_server_url,
            &index_id.to_string(),
            &file_id.to_string(),
        )
        .into_owned();
        Ok((file, content))
    }

    /// Replaces a document's content. Image links pointing at the image
    /// endpoint are stored as document-relative paths.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] for non-UTF-8 content,
    /// [`ApiError::IndexNotFound`] or [`ApiError::FileNotFound`].
    pub async fn update_file(
        &self,
        user_id: UserId,
        index_id: IndexId,
        file_id: FileId,
        bytes: Vec<u8>,
    ) -> Result<KbFile, ApiError> {
        let mut file = self.owned_file(user_id, index_id, file_id).await?;
        let content = utf8(bytes)?;
        let content = to_local_links(&content, &self.image_server_url);
        self.files
            .write_document(index_id, file_id, &file.name, content.as_bytes())
            .await?;

        let now = Utc::now();
        self.store.touch_file(file_id, now).await?;
        file.updated_at = now;
        tracing::debug!(%file_id, bytes = content.len(), "file updated");
        Ok(file)
    }

    /// Renames a file and its document on disk.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidFileName`], [`ApiError::IndexNotFound`],
    /// [`ApiError::FileNotFound`] or [`ApiError::FileExists`].
    pub async fn rename_file(
        &self,
        user_id: UserId,
        index_id: IndexId,
        file_id: FileId,
        name: &str,
    ) -> Result<(), ApiError> {
        if !is_valid_name(name) {
            return Err(ApiError::InvalidFileName);
        }
        let file = self.owned_file(user_id, index_id, file_id).await?;
        if file.name == name {
            return Ok(());
        }

        self.store.rename_file(file_id, name, Utc::now()).await?;
        if let Err(e) = self
            .files
            .rename_document(index_id, file_id, &file.name, name)
            .await
        {
            let _ = self.store.rename_file(file_id, &file.name, file.updated_at).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Finds files of an owned knowledge base by exact name, or by
    /// substring when `fuzzy` is set.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexNotFound`] if it is not owned by the caller.
    pub async fn search_files(
        &self,
        user_id: UserId,
        index_id: IndexId,
        name: &str,
        fuzzy: bool,
    ) -> Result<Vec<KbFile>, ApiError> {
        let files = self.list_files(user_id, index_id).await?;
        Ok(files
            .into_iter()
            .filter(|file| {
                if fuzzy {
                    file.name.contains(name)
                } else {
                    file.name == name
                }
            })
            .collect())
    }

    /// The caller's newest files, by `mode` (`modified` or `created`).
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] for any other mode.
    pub async fn recent_docs(&self, user_id: UserId, mode: &str) -> Result<Vec<KbFile>, ApiError> {
        let order: RecentOrder = mode.parse()?;
        self.store.recent_files(user_id, order, RECENT_LIMIT).await
    }

    /// Moves a file into the recycle bin.
    ///
    /// # Errors
    ///
    /// [`ApiError::IndexNotFound`] or [`ApiError::FileNotFound`].
    pub async fn recycle_file(&self, user_id: UserId, index_id: IndexId, file_id: FileId) -> Result<(), ApiError> {
        self.owned_file(user_id, index_id, file_id).await?;
        self.files.recycle(index_id, file_id).await?;
        if let Err(e) = self.store.recycle_file(file_id, Utc::now()).await {
            if let Err(undo) = self.files.restore(index_id, file_id).await {
                tracing::error!(%file_id, error = %undo, "could not move recycled file back");
            }
            return Err(e);
        }
        tracing::info!(%file_id, %index_id, "file recycled");
        Ok(())
    }

    // ── Images ──────────────────────────────────────────────────────────

    /// Stores an image next to a document and returns its public URL.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] for unsupported image types,
    /// [`ApiError::IndexNotFound`] or [`ApiError::FileNotFound`].
    pub async fn upload_image(
        &self,
        user_id: UserId,
        index_id: IndexId,
        file_id: FileId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, ApiError> {
        let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
        if !is_image_name(base) || !is_plain_segment(base) {
            return Err(ApiError::InvalidParams(format!("unsupported image: {file_name}")));
        }
        self.owned_file(user_id, index_id, file_id).await?;

        let stored = format!("{}_{base}", Utc::now().timestamp());
        self.files.save_image(index_id, file_id, &stored, bytes).await?;
        Ok(format!(
            "{}/{index_id}/{file_id}/{stored}",
            self.image_server_url.trim_end_matches('/')
        ))
    }

    /// Reads an image of a live document, or of a share snapshot when
    /// `index_segment` is `share`.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] for malformed segments,
    /// [`ApiError::RecordNotFound`] if there is no such image.
    pub async fn read_image(&self, index_segment: &str, file_segment: &str, image_name: &str) -> Result<Image, ApiError> {
        if !is_plain_segment(image_name) {
            return Err(ApiError::InvalidParams("image name".to_string()));
        }
        let file_id: FileId = file_segment
            .parse()
            .map_err(|_| ApiError::InvalidParams("kb_file_id".to_string()))?;

        let read = if index_segment == SHARE_SEGMENT {
            self.files.read_snapshot_image(file_id, image_name).await
        } else {
            let index_id: IndexId = index_segment
                .parse()
                .map_err(|_| ApiError::InvalidParams("index_id".to_string()))?;
            self.files.read_image(index_id, file_id, image_name).await
        };
        let bytes = read.map_err(|e| not_found_as(e, ApiError::RecordNotFound("image".to_string())))?;

        Ok(Image {
            bytes,
            content_type: image_content_type(image_name),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const PREFIX: &str = "http://img.test/images";

    async fn service() -> (tempfile::TempDir, LibraryService) {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let files = FileStore::new(dir.path());
        let Ok(()) = files.ensure_layout().await else {
            panic!("layout failed");
        };
        (dir, LibraryService::new(Arc::new(MemoryStore::new()), files, PREFIX))
    }

    async fn index(lib: &LibraryService, user: UserId) -> IndexId {
        let Ok(index) = lib.create_index(user, "notes").await else {
            panic!("create_index failed");
        };
        index.id
    }

    #[tokio::test]
    async fn index_names_are_validated_and_unique() {
        let (_dir, lib) = service().await;
        let user = UserId::new();
        assert!(matches!(lib.create_index(user, "a/b").await, Err(ApiError::InvalidIndexName)));
        let id = index(&lib, user).await;
        assert!(matches!(lib.create_index(user, "notes").await, Err(ApiError::IndexExists)));
        // Other users may reuse the name.
        assert!(lib.create_index(UserId::new(), "notes").await.is_ok());

        assert!(matches!(lib.rename_index(user, id, "a*b").await, Err(ApiError::InvalidIndexName)));
        assert!(lib.rename_index(user, id, "work").await.is_ok());
        assert!(matches!(lib.list_indexes(user).await, Ok(v) if v.len() == 1));
    }

    #[tokio::test]
    async fn foreign_indexes_look_missing() {
        let (_dir, lib) = service().await;
        let owner = UserId::new();
        let id = index(&lib, owner).await;
        let stranger = UserId::new();
        assert!(matches!(lib.list_files(stranger, id).await, Err(ApiError::IndexNotFound)));
        assert!(matches!(lib.delete_index(stranger, id).await, Err(ApiError::IndexNotFound)));
        assert!(lib.delete_index(owner, id).await.is_ok());
        assert!(matches!(lib.list_files(owner, id).await, Err(ApiError::IndexNotFound)));
    }

    #[tokio::test]
    async fn file_lifecycle() {
        let (_dir, lib) = service().await;
        let user = UserId::new();
        let index_id = index(&lib, user).await;

        assert!(matches!(lib.create_file(user, index_id, "a?").await, Err(ApiError::InvalidFileName)));
        let Ok(file) = lib.create_file(user, index_id, "draft").await else {
            panic!("create_file failed");
        };
        assert!(matches!(lib.create_file(user, index_id, "draft").await, Err(ApiError::FileExists)));

        let body = format!("# T\n![p]({PREFIX}/{index_id}/{}/1_p.png)", file.id);
        assert!(lib.update_file(user, index_id, file.id, body.into_bytes()).await.is_ok());
        let Ok(stored) = lib.files.read_document(index_id, file.id, "draft").await else {
            panic!("document missing");
        };
        assert_eq!(stored, "# T\n![p](images/1_p.png)");

        let Ok((_, content)) = lib.read_file(user, index_id, file.id).await else {
            panic!("read_file failed");
        };
        assert_eq!(content, format!("# T\n![p]({PREFIX}/{index_id}/{}/1_p.png)", file.id));

        assert!(lib.rename_file(user, index_id, file.id, "final").await.is_ok());
        assert!(matches!(lib.read_file(user, index_id, file.id).await, Ok((f, _)) if f.name == "final"));

        assert!(lib.recycle_file(user, index_id, file.id).await.is_ok());
        assert!(matches!(lib.read_file(user, index_id, file.id).await, Err(ApiError::FileNotFound)));
    }

    #[tokio::test]
    async fn failed_recycle_leaves_the_file_live() {
        let (dir, lib) = service().await;
        let user = UserId::new();
        let index_id = index(&lib, user).await;
        let Ok(file) = lib.create_file(user, index_id, "kept").await else {
            panic!("create_file failed");
        };
        // A non-empty directory in the way makes the move fail.
        let blocker = dir.path().join("recycle_bin").join(file.id.to_string());
        let Ok(()) = tokio::fs::create_dir_all(&blocker).await else {
            panic!("mkdir failed");
        };
        let Ok(()) = tokio::fs::write(blocker.join("stale"), b"x").await else {
            panic!("write failed");
        };

        assert!(lib.recycle_file(user, index_id, file.id).await.is_err());
        assert!(matches!(lib.list_files(user, index_id).await, Ok(v) if v.len() == 1));
        assert!(matches!(lib.store.recycle_entry(file.id).await, Ok(None)));
        assert!(lib.files.read_document(index_id, file.id, "kept").await.is_ok());
    }

    #[tokio::test]
    async fn failed_index_removal_keeps_the_records() {
        let (dir, lib) = service().await;
        let user = UserId::new();
        let index_id = index(&lib, user).await;
        let index_dir = dir.path().join("knowledge_base").join(index_id.to_string());
        let _ = tokio::fs::remove_dir_all(&index_dir).await;
        let Ok(()) = tokio::fs::write(&index_dir, b"not a directory").await else {
            panic!("write failed");
        };

        assert!(lib.delete_index(user, index_id).await.is_err());
        assert!(lib.owned_index(user, index_id).await.is_ok());
    }

    #[tokio::test]
    async fn import_accepts_markdown_only() {
        let (_dir, lib) = service().await;
        let user = UserId::new();
        let index_id = index(&lib, user).await;
        assert!(matches!(
            lib.import_file(user, index_id, "paper.pdf", b"%PDF".to_vec()).await,
            Err(ApiError::ImportFailed(_))
        ));
        let Ok(file) = lib.import_file(user, index_id, "readme.MD", b"# Readme".to_vec()).await else {
            panic!("import failed");
        };
        assert_eq!(file.name, "readme");
        assert!(matches!(lib.read_file(user, index_id, file.id).await, Ok((_, c)) if c == "# Readme"));
    }

    #[tokio::test]
    async fn search_and_recent() {
        let (_dir, lib) = service().await;
        let user = UserId::new();
        let index_id = index(&lib, user).await;
        for name in ["alpha", "alphabet", "beta"] {
            let _ = lib.create_file(user, index_id, name).await;
        }
        assert!(matches!(lib.search_files(user, index_id, "alpha", false).await, Ok(v) if v.len() == 1));
        assert!(matches!(lib.search_files(user, index_id, "alpha", true).await, Ok(v) if v.len() == 2));
        assert!(matches!(lib.search_files(user, index_id, "zeta", true).await, Ok(v) if v.is_empty()));

        assert!(matches!(lib.recent_docs(user, "created").await, Ok(v) if v.len() == 3));
        assert!(matches!(lib.recent_docs(user, "modified").await, Ok(v) if v.len() == 3));
        assert!(matches!(lib.recent_docs(user, "random").await, Err(ApiError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn images_upload_and_serve() {
        let (_dir, lib) = service().await;
        let user = UserId::new();
        let index_id = index(&lib, user).await;
        let Ok(file) = lib.create_file(user, index_id, "pics").await else {
            panic!("create_file failed");
        };

        assert!(matches!(
            lib.upload_image(user, index_id, file.id, "evil.svg", b"<svg/>").await,
            Err(ApiError::InvalidParams(_))
        ));
        let Ok(url) = lib.upload_image(user, index_id, file.id, "cat.PNG", b"png").await else {
            panic!("upload failed");
        };
        let prefix = format!("{PREFIX}/{index_id}/{}/", file.id);
        let Some(stored) = url.strip_prefix(&prefix) else {
            panic!("unexpected url {url}");
        };
        assert!(stored.ends_with("_cat.PNG"));

        let Ok(image) = lib.read_image(&index_id.to_string(), &file.id.to_string(), stored).await else {
            panic!("read_image failed");
        };
        assert_eq!(image.bytes, b"png");
        assert_eq!(image.content_type, "image/png");

        assert!(matches!(
            lib.read_image(&index_id.to_string(), &file.id.to_string(), "..").await,
            Err(ApiError::InvalidParams(_))
        ));
        assert!(matches!(
            lib.read_image(&index_id.to_string(), &file.id.to_string(), "nope.png").await,
            Err(ApiError::RecordNotFound(_))
        ));
    }
}
