mod backend;
mod config;
mod engine;
mod error;
mod geo;
mod models;
mod observability;
mod repo;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::backend::http::HttpBackend;
use crate::backend::memory::InMemoryBackend;
use crate::backend::RemoteBackend;
use crate::engine::service::TripSyncService;
use crate::engine::sync::run_sync_loop;
use crate::state::SyncStore;
use crate::store::JsonFileStore;

#[tokio::main]
async fn main() -> Result<(), error::TripError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let remote: Arc<dyn RemoteBackend> = match &config.backend_url {
        Some(url) => {
            tracing::info!(backend_url = %url, "using http backend");
            Arc::new(HttpBackend::new(url.clone())?)
        }
        None => {
            tracing::warn!("BACKEND_URL not set; using in-memory backend");
            Arc::new(InMemoryBackend::new())
        }
    };

    let passenger_id = match config.passenger_id {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4();
            tracing::info!(passenger_id = %id, "PASSENGER_ID not set; using a fresh session id");
            id
        }
    };

    let kv = Arc::new(JsonFileStore::open(&config.data_dir).await?);
    let sync_store = Arc::new(SyncStore::new());

    let service =
        TripSyncService::open(remote, kv, sync_store.clone(), config.clone(), passenger_id).await?;

    tokio::spawn(run_sync_loop(service.clone()));

    tracing::info!(
        passenger_id = %passenger_id,
        pending = sync_store.queue_len().await,
        "trip sync engine started"
    );

    shutdown_signal().await;
    tracing::info!("shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
