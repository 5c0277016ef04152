//! PostgreSQL implementation of [`MetadataStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{MetadataStore, RecentOrder};
use crate::config::AppConfig;
use crate::domain::{FileId, IndexId, KbFile, KnowledgeBase, RecycleEntry, ShareFile, User, UserId};
use crate::error::ApiError;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";
const INDEX_COLUMNS: &str = "id, user_id, name, created_at, updated_at";
const FILE_COLUMNS: &str = "id, index_id, user_id, name, created_at, updated_at";
const RECYCLE_COLUMNS: &str = "file_id, index_id, user_id, name, created_at, deleted_at";
const SHARE_COLUMNS: &str = "id, index_id, user_id, name, password, created_at";

/// PostgreSQL-backed metadata store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn persistence(e: sqlx::Error) -> ApiError {
    ApiError::Persistence(e.to_string())
}

/// Maps a unique violation to the error chosen by `on_conflict` for the
/// violated constraint.
fn conflict(e: sqlx::Error, on_conflict: impl Fn(Option<&str>) -> ApiError) -> ApiError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return on_conflict(db.constraint());
    }
    persistence(e)
}

fn user_conflict(constraint: Option<&str>) -> ApiError {
    match constraint {
        Some("users_email_key") => ApiError::EmailExists,
        _ => ApiError::UserExists,
    }
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with the pool settings from `config` and applies the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] if the database is unreachable or
    /// a migration fails.
    pub async fn connect(config: &AppConfig) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(persistence)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ApiError::Persistence(format!("migration failed: {e}")))?;
        tracing::info!("database migrations applied");

        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn insert_user(&self, user: &User) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, user_conflict))?;
        Ok(())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn rename_user(
        &self,
        id: UserId,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let result = sqlx::query("UPDATE users SET username = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(username)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict(e, user_conflict))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::RecordNotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(persistence)?;
        if result.rows_affected() == 0 {
            return Err(ApiError::RecordNotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_index(&self, index: &KnowledgeBase) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO knowledge_bases (id, user_id, name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(index.id)
        .bind(index.user_id)
        .bind(&index.name)
        .bind(index.created_at)
        .bind(index.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, |_| ApiError::IndexExists))?;
        Ok(())
    }

    async fn index_by_id(&self, id: IndexId) -> Result<Option<KnowledgeBase>, ApiError> {
        sqlx::query_as::<_, KnowledgeBase>(&format!(
            "SELECT {INDEX_COLUMNS} FROM knowledge_bases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn indexes_of(&self, user_id: UserId) -> Result<Vec<KnowledgeBase>, ApiError> {
        sqlx::query_as::<_, KnowledgeBase>(&format!(
            "SELECT {INDEX_COLUMNS} FROM knowledge_bases WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn rename_index(
        &self,
        id: IndexId,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let result =
            sqlx::query("UPDATE knowledge_bases SET name = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(name)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| conflict(e, |_| ApiError::IndexExists))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::IndexNotFound);
        }
        Ok(())
    }

    async fn delete_index(&self, id: IndexId) -> Result<Vec<KbFile>, ApiError> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        let files = sqlx::query_as::<_, KbFile>(&format!(
            "DELETE FROM kb_files WHERE index_id = $1 RETURNING {FILE_COLUMNS}"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(persistence)?;

        let result = sqlx::query("DELETE FROM knowledge_bases WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
        if result.rows_affected() == 0 {
            return Err(ApiError::IndexNotFound);
        }

        tx.commit().await.map_err(persistence)?;
        Ok(files)
    }

    async fn insert_file(&self, file: &KbFile) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO kb_files (id, index_id, user_id, name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(file.id)
        .bind(file.index_id)
        .bind(file.user_id)
        .bind(&file.name)
        .bind(file.created_at)
        .bind(file.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, |_| ApiError::FileExists))?;
        Ok(())
    }

    async fn file_by_id(&self, id: FileId) -> Result<Option<KbFile>, ApiError> {
        sqlx::query_as::<_, KbFile>(&format!("SELECT {FILE_COLUMNS} FROM kb_files WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)
    }

    async fn files_in(&self, index_id: IndexId) -> Result<Vec<KbFile>, ApiError> {
        sqlx::query_as::<_, KbFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM kb_files WHERE index_id = $1 ORDER BY created_at ASC"
        ))
        .bind(index_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn rename_file(&self, id: FileId, name: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
        let result = sqlx::query("UPDATE kb_files SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict(e, |_| ApiError::FileExists))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::FileNotFound);
        }
        Ok(())
    }

    async fn touch_file(&self, id: FileId, now: DateTime<Utc>) -> Result<(), ApiError> {
        let result = sqlx::query("UPDATE kb_files SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        if result.rows_affected() == 0 {
            return Err(ApiError::FileNotFound);
        }
        Ok(())
    }

    async fn recent_files(
        &self,
        user_id: UserId,
        order: RecentOrder,
        limit: usize,
    ) -> Result<Vec<KbFile>, ApiError> {
        let column = match order {
            RecentOrder::Modified => "updated_at",
            RecentOrder::Created => "created_at",
        };
        sqlx::query_as::<_, KbFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM kb_files WHERE user_id = $1 \
             ORDER BY {column} DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn recycle_file(&self, id: FileId, now: DateTime<Utc>) -> Result<RecycleEntry, ApiError> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        let file = sqlx::query_as::<_, KbFile>(&format!(
            "DELETE FROM kb_files WHERE id = $1 RETURNING {FILE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence)?
        .ok_or(ApiError::FileNotFound)?;

        let entry = RecycleEntry::from_file(&file, now);
        sqlx::query(
            "INSERT INTO recycle_entries (file_id, index_id, user_id, name, created_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.file_id)
        .bind(entry.index_id)
        .bind(entry.user_id)
        .bind(&entry.name)
        .bind(entry.created_at)
        .bind(entry.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(persistence)?;

        tx.commit().await.map_err(persistence)?;
        Ok(entry)
    }

    async fn recycle_entry(&self, id: FileId) -> Result<Option<RecycleEntry>, ApiError> {
        sqlx::query_as::<_, RecycleEntry>(&format!(
            "SELECT {RECYCLE_COLUMNS} FROM recycle_entries WHERE file_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn recycled_of(&self, user_id: UserId) -> Result<Vec<RecycleEntry>, ApiError> {
        sqlx::query_as::<_, RecycleEntry>(&format!(
            "SELECT {RECYCLE_COLUMNS} FROM recycle_entries WHERE user_id = $1 \
             ORDER BY deleted_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn recycled_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<RecycleEntry>, ApiError> {
        sqlx::query_as::<_, RecycleEntry>(&format!(
            "SELECT {RECYCLE_COLUMNS} FROM recycle_entries WHERE deleted_at < $1 \
             ORDER BY deleted_at ASC"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn restore_file(&self, id: FileId, now: DateTime<Utc>) -> Result<KbFile, ApiError> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        let entry = sqlx::query_as::<_, RecycleEntry>(&format!(
            "DELETE FROM recycle_entries WHERE file_id = $1 RETURNING {RECYCLE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence)?
        .ok_or(ApiError::RecycledFileNotFound)?;

        let index_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM knowledge_bases WHERE id = $1)")
                .bind(entry.index_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(persistence)?;
        if !index_exists {
            return Err(ApiError::IndexNotFound);
        }

        let file = entry.restore(now);
        sqlx::query(
            "INSERT INTO kb_files (id, index_id, user_id, name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(file.id)
        .bind(file.index_id)
        .bind(file.user_id)
        .bind(&file.name)
        .bind(file.created_at)
        .bind(file.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict(e, |_| ApiError::FileExists))?;

        tx.commit().await.map_err(persistence)?;
        Ok(file)
    }

    async fn delete_recycled(&self, id: FileId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM recycle_entries WHERE file_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_share(&self, share: &ShareFile) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO share_files (id, index_id, user_id, name, password, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(share.id)
        .bind(share.index_id)
        .bind(share.user_id)
        .bind(&share.name)
        .bind(&share.password)
        .bind(share.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, |_| ApiError::ShareExists))?;
        Ok(())
    }

    async fn share_by_id(&self, id: FileId) -> Result<Option<ShareFile>, ApiError> {
        sqlx::query_as::<_, ShareFile>(&format!(
            "SELECT {SHARE_COLUMNS} FROM share_files WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn shares_of(&self, user_id: UserId) -> Result<Vec<ShareFile>, ApiError> {
        sqlx::query_as::<_, ShareFile>(&format!(
            "SELECT {SHARE_COLUMNS} FROM share_files WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)
    }

    async fn delete_share(&self, id: FileId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM share_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(result.rows_affected() > 0)
    }
}
