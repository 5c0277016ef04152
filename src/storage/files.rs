//! On-disk document trees.
//!
//! Layout under the data root:
//!
//! ```text
//! knowledge_base/<index_id>/<file_id>/<name>.md
//! knowledge_base/<index_id>/<file_id>/images/<image>
//! recycle_bin/<file_id>/...          (a recycled file directory)
//! share/<share_id>/...               (a snapshot of a file directory)
//! ```

use std::io;
use std::path::{Path, PathBuf};

use crate::domain::markdown::IMAGE_DIR;
use crate::domain::{FileId, IndexId};

const KNOWLEDGE_BASE_DIR: &str = "knowledge_base";
const RECYCLE_DIR: &str = "recycle_bin";
const SHARE_DIR: &str = "share";

/// Index segment used in image URLs of share snapshots.
pub const SHARE_SEGMENT: &str = "share";

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Reads and writes documents, images, recycled files and snapshots.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// A store rooted at `root`. Call [`FileStore::ensure_layout`] before use.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the top-level directories.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures.
    pub async fn ensure_layout(&self) -> io::Result<()> {
        for dir in [KNOWLEDGE_BASE_DIR, RECYCLE_DIR, SHARE_DIR] {
            tokio::fs::create_dir_all(self.root.join(dir)).await?;
        }
        Ok(())
    }

    fn index_dir(&self, index: IndexId) -> PathBuf {
        self.root.join(KNOWLEDGE_BASE_DIR).join(index.to_string())
    }

    fn file_dir(&self, index: IndexId, file: FileId) -> PathBuf {
        self.index_dir(index).join(file.to_string())
    }

    fn recycled_dir(&self, file: FileId) -> PathBuf {
        self.root.join(RECYCLE_DIR).join(file.to_string())
    }

    fn snapshot_dir(&self, share: FileId) -> PathBuf {
        self.root.join(SHARE_DIR).join(share.to_string())
    }

    fn document_name(name: &str) -> String {
        format!("{name}.md")
    }

    // ── Knowledge bases ─────────────────────────────────────────────────

    /// Creates the directory of a knowledge base.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures.
    pub async fn create_index_dir(&self, index: IndexId) -> io::Result<()> {
        tokio::fs::create_dir_all(self.index_dir(index)).await
    }

    /// Removes a knowledge base directory and everything in it.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures other than a missing directory.
    pub async fn remove_index_dir(&self, index: IndexId) -> io::Result<()> {
        ignore_missing(tokio::fs::remove_dir_all(self.index_dir(index)).await)
    }

    // ── Documents ───────────────────────────────────────────────────────

    /// Writes (creating or replacing) a document and its `images/` directory.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures.
    pub async fn write_document(
        &self,
        index: IndexId,
        file: FileId,
        name: &str,
        content: &[u8],
    ) -> io::Result<()> {
        let dir = self.file_dir(index, file);
        tokio::fs::create_dir_all(dir.join(IMAGE_DIR)).await?;
        tokio::fs::write(dir.join(Self::document_name(name)), content).await
    }

    /// Reads a document.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if it does not exist.
    pub async fn read_document(&self, index: IndexId, file: FileId, name: &str) -> io::Result<String> {
        tokio::fs::read_to_string(self.file_dir(index, file).join(Self::document_name(name))).await
    }

    /// Renames a document on disk.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures.
    pub async fn rename_document(
        &self,
        index: IndexId,
        file: FileId,
        from: &str,
        to: &str,
    ) -> io::Result<()> {
        let dir = self.file_dir(index, file);
        tokio::fs::rename(
            dir.join(Self::document_name(from)),
            dir.join(Self::document_name(to)),
        )
        .await
    }

    // ── Recycle bin ─────────────────────────────────────────────────────

    /// Moves a file directory into the recycle bin.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures other than a missing source.
    pub async fn recycle(&self, index: IndexId, file: FileId) -> io::Result<()> {
        ignore_missing(tokio::fs::rename(self.file_dir(index, file), self.recycled_dir(file)).await)
    }

    /// Moves a recycled file directory back into its knowledge base.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures other than a missing source.
    pub async fn restore(&self, index: IndexId, file: FileId) -> io::Result<()> {
        tokio::fs::create_dir_all(self.index_dir(index)).await?;
        ignore_missing(tokio::fs::rename(self.recycled_dir(file), self.file_dir(index, file)).await)
    }

    /// Permanently removes a recycled file directory.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures other than a missing directory.
    pub async fn purge_recycled(&self, file: FileId) -> io::Result<()> {
        ignore_missing(tokio::fs::remove_dir_all(self.recycled_dir(file)).await)
    }

    // ── Share snapshots ─────────────────────────────────────────────────

    /// Copies a file directory into a share snapshot, replacing any
    /// previous snapshot.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures.
    pub async fn create_snapshot(&self, index: IndexId, file: FileId, share: FileId) -> io::Result<()> {
        let target = self.snapshot_dir(share);
        ignore_missing(tokio::fs::remove_dir_all(&target).await)?;
        copy_dir(&self.file_dir(index, file), &target).await
    }

    /// Reads the document of a share snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if it does not exist.
    pub async fn read_snapshot(&self, share: FileId, name: &str) -> io::Result<String> {
        tokio::fs::read_to_string(self.snapshot_dir(share).join(Self::document_name(name))).await
    }

    /// Removes a share snapshot.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures other than a missing directory.
    pub async fn remove_snapshot(&self, share: FileId) -> io::Result<()> {
        ignore_missing(tokio::fs::remove_dir_all(self.snapshot_dir(share)).await)
    }

    // ── Images ──────────────────────────────────────────────────────────

    /// Stores an image next to a document.
    ///
    /// `image_name` must already be a plain file name.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures.
    pub async fn save_image(
        &self,
        index: IndexId,
        file: FileId,
        image_name: &str,
        bytes: &[u8],
    ) -> io::Result<()> {
        let dir = self.file_dir(index, file).join(IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(image_name), bytes).await
    }

    /// Reads an image of a live document.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if it does not exist.
    pub async fn read_image(&self, index: IndexId, file: FileId, image_name: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.file_dir(index, file).join(IMAGE_DIR).join(image_name)).await
    }

    /// Reads an image of a share snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if it does not exist.
    pub async fn read_snapshot_image(&self, share: FileId, image_name: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.snapshot_dir(share).join(IMAGE_DIR).join(image_name)).await
    }
}

/// Recursively copies `from` into a new directory `to`.
async fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        tokio::fs::create_dir_all(&dst).await?;
        let mut entries = tokio::fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), target).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, FileStore) {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let store = FileStore::new(dir.path());
        let Ok(()) = store.ensure_layout().await else {
            panic!("layout failed");
        };
        (dir, store)
    }

    #[tokio::test]
    async fn write_read_rename() {
        let (_dir, fs) = store().await;
        let (index, file) = (IndexId::new(), FileId::new());
        assert!(fs.write_document(index, file, "a", b"# A").await.is_ok());
        assert!(matches!(fs.read_document(index, file, "a").await, Ok(s) if s == "# A"));

        assert!(fs.rename_document(index, file, "a", "b").await.is_ok());
        assert!(fs.read_document(index, file, "a").await.is_err());
        assert!(matches!(fs.read_document(index, file, "b").await, Ok(s) if s == "# A"));
    }

    #[tokio::test]
    async fn recycle_and_restore_move_the_directory() {
        let (_dir, fs) = store().await;
        let (index, file) = (IndexId::new(), FileId::new());
        let _ = fs.write_document(index, file, "doc", b"body").await;
        let _ = fs.save_image(index, file, "1_x.png", b"png").await;

        assert!(fs.recycle(index, file).await.is_ok());
        assert!(fs.read_document(index, file, "doc").await.is_err());

        assert!(fs.restore(index, file).await.is_ok());
        assert!(matches!(fs.read_image(index, file, "1_x.png").await, Ok(b) if b == b"png"));
    }

    #[tokio::test]
    async fn snapshots_copy_images() {
        let (_dir, fs) = store().await;
        let (index, file) = (IndexId::new(), FileId::new());
        let _ = fs.write_document(index, file, "doc", b"shared body").await;
        let _ = fs.save_image(index, file, "1_y.gif", b"gif").await;

        assert!(fs.create_snapshot(index, file, file).await.is_ok());
        // Later edits do not reach the snapshot.
        let _ = fs.write_document(index, file, "doc", b"edited").await;

        assert!(matches!(fs.read_snapshot(file, "doc").await, Ok(s) if s == "shared body"));
        assert!(matches!(fs.read_snapshot_image(file, "1_y.gif").await, Ok(b) if b == b"gif"));

        assert!(fs.remove_snapshot(file).await.is_ok());
        assert!(fs.read_snapshot(file, "doc").await.is_err());
    }

    #[tokio::test]
    async fn removing_missing_things_is_fine() {
        let (_dir, fs) = store().await;
        assert!(fs.remove_index_dir(IndexId::new()).await.is_ok());
        assert!(fs.purge_recycled(FileId::new()).await.is_ok());
        assert!(fs.remove_snapshot(FileId::new()).await.is_ok());
    }
}
