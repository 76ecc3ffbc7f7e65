//! HTTP server for the sync endpoints

use crate::config::ServerConfig;
use crate::error::{AppError, Result};
use crate::server::handlers;
use crate::state::AppState;
use axum::{
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the sync router
pub fn router(state: Arc<AppState>) -> Router {
    // Browser clients on any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ================================================================
        // Health check
        // ================================================================
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::health_check))

        // ================================================================
        // Sync record
        // GET /sync?id=<code>, PUT /sync?id=<code>
        // ================================================================
        .route(
            "/sync",
            get(handlers::get_sync)
                .put(handlers::put_sync)
                .post(handlers::put_sync),
        )

        // ================================================================
        // Add state and middleware
        // ================================================================
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Sync server manager
#[derive(Default)]
pub struct SyncServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl SyncServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the configured store and start serving
    pub async fn start(&mut self, config: &ServerConfig) -> Result<SocketAddr> {
        let state = Arc::new(AppState::from_config(config)?);
        self.start_with_state(&config.host, config.port, state).await
    }

    /// Start serving `state` on `host:port`. Port 0 picks a free port.
    pub async fn start_with_state(
        &mut self,
        host: &str,
        port: u16,
        state: Arc<AppState>,
    ) -> Result<SocketAddr> {
        if self.is_running() {
            return Err(AppError::Internal("Sync server already running".to_string()));
        }

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address {}:{}: {}", host, port, e)))?;

        let app = router(state);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Sync server shutting down");
            });

            if let Err(e) = server.await {
                error!("Sync server error: {}", e);
            }
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        self.local_addr = Some(local_addr);

        info!("Sync server listening on {}", local_addr);
        info!("  GET  http://{}/health", local_addr);
        info!("  GET  http://{}/sync?id={{code}}", local_addr);
        info!("  PUT  http://{}/sync?id={{code}}", local_addr);

        Ok(local_addr)
    }

    /// Bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop the server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("Sync server stop signal sent");
        }
        self.local_addr = None;
    }

    /// Stop and wait for in-flight requests to finish
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Sync server task failed: {}", e);
            }
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

impl Drop for SyncServer {
    fn drop(&mut self) {
        self.stop();
    }
}
