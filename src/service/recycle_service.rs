//! Recycle bin: restore, permanent deletion and the retention sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{FileId, IndexId, KbFile, RecycleEntry, UserId};
use crate::error::ApiError;
use crate::storage::{FileStore, MetadataStore};

/// Recycle bin operations.
#[derive(Debug, Clone)]
pub struct RecycleService {
    store: Arc<dyn MetadataStore>,
    files: FileStore,
    retention: TimeDelta,
}

impl RecycleService {
    /// Creates a new `RecycleService` keeping entries for `retention_days`.
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>, files: FileStore, retention_days: i64) -> Self {
        Self {
            store,
            files,
            retention: TimeDelta::try_days(retention_days.max(0)).unwrap_or(TimeDelta::MAX),
        }
    }

    async fn owned_entry(&self, user_id: UserId, file_id: FileId, index_id: IndexId) -> Result<RecycleEntry, ApiError> {
        self.store
            .recycle_entry(file_id)
            .await?
            .filter(|entry| entry.user_id == user_id && entry.index_id == index_id)
            .ok_or(ApiError::RecycledFileNotFound)
    }

    async fn purge(&self, entry: &RecycleEntry) -> Result<bool, ApiError> {
        let removed = self.store.delete_recycled(entry.file_id).await?;
        self.files.purge_recycled(entry.file_id).await?;
        Ok(removed)
    }

    /// The caller's recycled files, most recently deleted first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] on storage failure.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<RecycleEntry>, ApiError> {
        self.store.recycled_of(user_id).await
    }

    /// Moves a recycled file back into its knowledge base.
    ///
    /// # Errors
    ///
    /// [`ApiError::RecycledFileNotFound`], [`ApiError::IndexNotFound`] if the
    /// knowledge base is gone, [`ApiError::FileExists`] on a name clash.
    pub async fn restore(&self, user_id: UserId, file_id: FileId, index_id: IndexId) -> Result<KbFile, ApiError> {
        self.owned_entry(user_id, file_id, index_id).await?;
        self.files.restore(index_id, file_id).await?;
        let file = match self.store.restore_file(file_id, Utc::now()).await {
            Ok(file) => file,
            Err(e) => {
                if let Err(undo) = self.files.recycle(index_id, file_id).await {
                    tracing::error!(%file_id, error = %undo, "could not move restored file back");
                }
                return Err(e);
            }
        };
        tracing::info!(%file_id, %index_id, "file restored");
        Ok(file)
    }

    /// Permanently deletes one recycled file.
    ///
    /// # Errors
    ///
    /// [`ApiError::RecycledFileNotFound`] if it is not the caller's.
    pub async fn delete(&self, user_id: UserId, file_id: FileId, index_id: IndexId) -> Result<(), ApiError> {
        let entry = self.owned_entry(user_id, file_id, index_id).await?;
        self.purge(&entry).await?;
        tracing::info!(%file_id, "recycled file deleted");
        Ok(())
    }

    /// Permanently deletes all of the caller's recycled files.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] or [`ApiError::Io`]; entries purged before
    /// the failure stay purged.
    pub async fn clear(&self, user_id: UserId) -> Result<usize, ApiError> {
        let mut purged = 0;
        for entry in self.store.recycled_of(user_id).await? {
            if self.purge(&entry).await? {
                purged += 1;
            }
        }
        tracing::info!(%user_id, purged, "recycle bin cleared");
        Ok(purged)
    }

    /// Permanently deletes every entry, of any user, recycled longer ago
    /// than the retention period.
    ///
    /// # Errors
    ///
    /// [`ApiError::Persistence`] or [`ApiError::Io`].
    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<usize, ApiError> {
        // A cutoff before the earliest representable time matches nothing.
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return Ok(0);
        };
        let mut purged = 0;
        for entry in self.store.recycled_before(cutoff).await? {
            if self.purge(&entry).await? {
                purged += 1;
            }
        }
        Ok(purged)
    }

    /// Runs [`RecycleService::cleanup`] every `every`. A zero interval
    /// disables the sweep.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> Option<tokio::task::JoinHandle<()>> {
        if every.is_zero() {
            return None;
        }
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match self.cleanup(Utc::now()).await {
                    Ok(purged) if purged > 0 => tracing::info!(purged, "recycle bin swept"),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "recycle sweep failed"),
                }
            }
        }))
    }
}
