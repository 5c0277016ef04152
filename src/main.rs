//! gcnote server entry point.
//!
//! Starts the API listener (REST, image and share socket endpoints) and
//! the dedicated sync listener, plus the recycle bin sweep.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use gcnote::api;
use gcnote::app_state::AppState;
use gcnote::config::AppConfig;
use gcnote::storage::{MemoryStore, MetadataStore, PostgresStore};
use gcnote::sync;

/// Upper bound on the delay before an idle sync room is evicted.
const SYNC_EVICT_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, data_dir = %config.data_dir.display(), "starting gcnote");
    if config.uses_default_jwt_secret() {
        tracing::warn!("JWT_SECRET is not set, login tokens use the built-in secret and can be forged");
    }

    // Build storage layer
    let store: Arc<dyn MetadataStore> = if config.persistence_enabled {
        let postgres = PostgresStore::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        tracing::info!("using PostgreSQL metadata store");
        Arc::new(postgres)
    } else {
        tracing::warn!("persistence disabled, metadata is kept in memory");
        Arc::new(MemoryStore::new())
    };

    // Build application state
    let sweep_every = Duration::from_secs(config.recycle_sweep_interval_secs);
    let room_ttl = Duration::from_secs(config.sync_room_idle_secs);
    let listen_addr = config.listen_addr;
    let sync_listen_addr = config.sync_listen_addr;
    let state = AppState::build(config, store)
        .await
        .context("preparing the data directory")?;

    let _sweeper = Arc::clone(&state.recycle).spawn_sweeper(sweep_every);
    let _evictor = Arc::clone(&state.sync).spawn_evictor(room_ttl.min(SYNC_EVICT_EVERY), room_ttl);

    // Start sync server
    let sync_listener = tokio::net::TcpListener::bind(sync_listen_addr)
        .await
        .with_context(|| format!("binding {sync_listen_addr}"))?;
    let sync_server = sync::server::serve(sync_listener, Arc::clone(&state.sync));

    // Start API server
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");
    let api_server = axum::serve(listener, api::build_app(state)).into_future();

    tokio::select! {
        result = api_server => result.context("API server stopped")?,
        result = sync_server => result.context("sync server stopped")?,
    }

    Ok(())
}
