//! Application state shared across handlers.

use crate::auth::TokenTable;
use reclaim_core::types::{AppConfig, AppConfigError};
use reclaim_core::{Clock, ObjectStore, TrashError, TrashService, UploadService};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("config error: {0}")]
    Config(#[from] AppConfigError),

    #[error("trash service error: {0}")]
    Trash(#[from] TrashError),
}

#[derive(Clone)]
pub struct AppState {
    pub trash: Arc<TrashService>,
    pub uploads: Arc<UploadService>,
    pub tokens: Arc<TokenTable>,
}

impl AppState {
    pub fn new(trash: TrashService, uploads: UploadService, tokens: TokenTable) -> Self {
        Self {
            trash: Arc::new(trash),
            uploads: Arc::new(uploads),
            tokens: Arc::new(tokens),
        }
    }

    /// Opens the ledger named by `config` and wires both services to `store`.
    pub fn open(
        config: &AppConfig,
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        let core = config.core_config()?;
        let trash = TrashService::open(&core, store.clone(), clock)?;
        let uploads = UploadService::new(store, core.artifact_bucket.clone());
        Ok(Self::new(trash, uploads, TokenTable::from_config(&config.auth)))
    }
}
