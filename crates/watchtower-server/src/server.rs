//! Aggregator server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use watchtower_store::{TimeSeriesStore, spawn_sweeper};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// The metrics aggregator: HTTP API plus the retention sweeper.
///
/// The sweeper lives exactly as long as a `serve*` call.
#[derive(Debug, Clone)]
pub struct AggregatorServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl AggregatorServer {
    /// Create a new server with an empty store.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::new(&config));
        Self { config, state }
    }

    /// The configuration this server was built with.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared request state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// A handle to the underlying store.
    #[must_use]
    pub fn store(&self) -> TimeSeriesStore {
        self.state.store().clone()
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(self.state())
    }

    /// Serve on `addr` until a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self, addr: SocketAddr) -> ServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve on `addr` until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;

        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener address cannot be read or the
    /// HTTP server fails.
    pub async fn serve_listener<F>(&self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        let sweeper = spawn_sweeper(self.store(), self.config.retention);

        info!(
            addr = %local_addr,
            max_age_secs = self.config.retention.max_age.as_secs(),
            sweep_interval_secs = self.config.retention.sweep_interval.as_secs(),
            "aggregator listening"
        );

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        if let Err(e) = sweeper.stop() {
            warn!(error = %e, "retention sweeper stopped early");
        }
        sweeper.join().await;

        info!("aggregator shut down");
        result
    }
}
