//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::navigation::Navigator;
use crate::service::{LibraryService, RecycleService, ShareService, ShareSnapshots, UserService};
use crate::storage::{FileStore, MetadataStore};
use crate::sync::{DocumentSource, SyncEngine};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Runtime configuration.
    pub config: Arc<AppConfig>,
    /// Login token issuer, also used by the [`crate::auth::AuthUser`] extractor.
    pub tokens: Arc<TokenIssuer>,
    /// Account operations.
    pub users: Arc<UserService>,
    /// Knowledge base, file and image operations.
    pub library: Arc<LibraryService>,
    /// Recycle bin operations.
    pub recycle: Arc<RecycleService>,
    /// Share operations.
    pub shares: Arc<ShareService>,
    /// Sync relay shared with the dedicated sync listener.
    pub sync: Arc<SyncEngine>,
    /// Client route table and guard.
    pub navigator: Arc<Navigator>,
}

impl AppState {
    /// Wires every service over `store` and the data directory of `config`,
    /// creating the on-disk layout if needed.
    ///
    /// # Errors
    ///
    /// [`ApiError::Io`] if the data directory cannot be prepared.
    pub async fn build(config: AppConfig, store: Arc<dyn MetadataStore>) -> Result<Self, ApiError> {
        let files = FileStore::new(&config.data_dir);
        files.ensure_layout().await?;

        let tokens = Arc::new(TokenIssuer::new(&config.jwt_secret, config.jwt_ttl_hours));
        let hasher = PasswordHasher::new(config.password_pepper.clone(), config.bcrypt_cost);

        let snapshots = Arc::new(ShareSnapshots::new(
            Arc::clone(&store),
            files.clone(),
            config.image_server_url.clone(),
        ));
        let source: Arc<dyn DocumentSource> = Arc::clone(&snapshots) as Arc<dyn DocumentSource>;
        let sync = Arc::new(SyncEngine::new(config.sync_client_buffer, Some(source)));

        Ok(Self {
            users: Arc::new(UserService::new(Arc::clone(&store), hasher, Arc::clone(&tokens))),
            library: Arc::new(LibraryService::new(
                Arc::clone(&store),
                files.clone(),
                config.image_server_url.clone(),
            )),
            recycle: Arc::new(RecycleService::new(
                Arc::clone(&store),
                files.clone(),
                config.recycle_retention_days,
            )),
            shares: Arc::new(ShareService::new(store, files, snapshots, Arc::clone(&sync))),
            sync,
            tokens,
            navigator: Arc::new(Navigator::default()),
            config: Arc::new(config),
        })
    }
}
