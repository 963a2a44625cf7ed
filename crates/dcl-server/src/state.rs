use std::path::PathBuf;
use std::sync::Arc;

use dcl_ledger::{DelegationLedger, InMemoryLedger};
use tokio::sync::Mutex;

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<DelegationLedger<InMemoryLedger>>,
    pub state_path: Option<PathBuf>,
    // Held from the pre-write snapshot until the file is written, so a rollback
    // never discards another request's commit.
    write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(ledger: DelegationLedger<InMemoryLedger>, state_path: Option<PathBuf>) -> Self {
        Self {
            ledger: Arc::new(ledger),
            state_path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run a ledger write and rewrite the state file, if one is configured.
    ///
    /// When `op` fails or the file cannot be written, the store is put back
    /// to where it was before `op`, so memory never holds changes the file
    /// lacks.
    pub async fn write<T>(
        &self,
        op: impl FnOnce(&DelegationLedger<InMemoryLedger>) -> ServerResult<T>,
    ) -> ServerResult<T> {
        let Some(path) = &self.state_path else {
            return op(&self.ledger);
        };
        let _guard = self.write_lock.lock().await;
        let store = self.ledger.store();
        let before = store.snapshot()?;
        let value = match op(&self.ledger) {
            Ok(value) => value,
            Err(e) => {
                // Periods opened on the way to the failure are dropped too.
                store.restore(before)?;
                return Err(e);
            }
        };

        let json = store.to_json()?;
        if let Err(e) = tokio::fs::write(path, json).await {
            tracing::error!(path = %path.display(), error = %e, "state file write failed, rolling back");
            store.restore(before)?;
            return Err(ServerError::Io(e));
        }
        tracing::debug!(path = %path.display(), "state file written");
        Ok(value)
    }
}
