use tokio::net::TcpListener;

use dcl_ledger::{DelegationLedger, InMemoryLedger};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::router::build_router;
use crate::state::AppState;

/// Delegation credit ledger server.
pub struct DclServer {
    config: ServerConfig,
    state: AppState,
}

impl DclServer {
    /// Load the state file (if configured) and build the ledger.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = match &config.state_path {
            Some(path) => InMemoryLedger::load(path)?,
            None => InMemoryLedger::new(),
        };
        let ledger = DelegationLedger::new(store, config.ledger.clone())?;
        let state = AppState::new(ledger, config.state_path.clone());
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = build_router(self.state);
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("DCL server listening on {}", self.config.bind_addr);
        axum::serve(listener, app).await?;
        Ok(())
    }
}
