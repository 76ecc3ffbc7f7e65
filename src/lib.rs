//! Watchlist Sync - shared stock watchlists across devices
//!
//! A small HTTP service storing one watchlist per sync code, and the client
//! side that keeps a local watchlist in step with it (periodic polling,
//! debounced pushes, last write wins).

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod scheduler;
pub mod server;
pub mod services;
pub mod state;
pub mod sync;
pub mod watchlist;

use config::ServerConfig;
use server::SyncServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watchlist_sync=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Run the sync server until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Watchlist Sync {}...", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env()?;
    let mut server = SyncServer::new();
    server.start(&config).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received");

    server.shutdown().await;
    tracing::info!("Watchlist Sync stopped");
    Ok(())
}
