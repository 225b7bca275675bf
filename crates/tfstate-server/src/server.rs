use std::sync::Arc;

use tfstate_store::{SqliteStateStore, StateSchema, StateStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Remote-state server: one store, one listener.
pub struct StateServer {
    state: AppState,
}

impl StateServer {
    pub fn new(config: ServerConfig, store: Arc<dyn StateStore>) -> Self {
        Self {
            state: AppState::new(config, store),
        }
    }

    /// Validate `config` and open its SQLite database with the default schema.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let store = SqliteStateStore::open(&config.database, StateSchema::default())?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        let addr = self.state.config.bind_addr;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            "tfstate server listening on {} (database {})",
            addr,
            self.state.config.database.display()
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
