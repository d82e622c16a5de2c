mod api;
mod config;
mod engine;
mod genesis;
mod lock;
mod models;
mod search;
mod store;
mod types;
mod wallets;

use std::io::stderr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::api::AppState;
use crate::config::{Backend, Config};
use crate::engine::TransferEngine;
use crate::genesis::Genesis;
use crate::lock::{DistributedMutex, LockService, MemoryLockService, RedisLockService};
use crate::search::WalletSearch;
use crate::store::DocumentStore;
use crate::wallets::WalletStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    setup_logging(config.log_level());
    config.validate()?;

    let backend = config.store_config().connect().await.context("Could not connect to the document store")?;

    match backend {
        Backend::InProcess(store) => {
            warn!("No store host configured, wallets and locks are local to this instance");
            let locks = MemoryLockService::new(config.lock_timeout()).with_retry_delay(config.lock_retry_delay());
            serve(&config, Arc::new(store), Arc::new(locks)).await
        }
        Backend::Redis(store) => {
            let locks = RedisLockService::new(store.connection(), config.lock_timeout()).with_retry_delay(config.lock_retry_delay());
            serve(&config, Arc::new(store), Arc::new(locks)).await
        }
    }
}

async fn serve<S: DocumentStore, L: LockService>(config: &Config, store: Arc<S>, locks: Arc<L>) -> Result<()> {
    let wallets = Arc::new(WalletStore::new(store.clone(), config.store_timeout(), config.existence_cache_capacity));
    let mutex = DistributedMutex::new(locks, config.lock_scope, config.lock_ttl());
    let engine = Arc::new(TransferEngine::new(store.clone(), wallets.clone(), mutex, config.engine_config()));
    let search = Arc::new(WalletSearch::new(store.clone(), config.store_timeout()));

    Genesis::new(store, wallets.clone(), &config.vault_id, config.vault_balance, config.store_timeout())
        .run()
        .await
        .context("Genesis failed")?;

    let app = api::router(AppState { wallets, engine, search });
    let listener = TcpListener::bind(config.listen_address).await
        .with_context(|| format!("Could not bind {}", config.listen_address))?;

    info!("Listening on {} with {:?} lock scope", config.listen_address, config.lock_scope);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {error}");
    }
}

fn setup_logging(level: LevelFilter) {
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}
