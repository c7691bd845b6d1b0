pub mod dispatcher;
pub mod error;
pub mod history;
pub mod http;
mod http_client;
pub mod models;
pub mod paths;
pub mod providers;
pub mod reconcile;
pub mod refresh;
pub mod services;
pub mod storage;

pub use error::{BalanceError, Result};
pub use models::*;

use providers::{BalanceChecker, ProviderEndpoints};
use refresh::RefreshTracker;
use std::path::Path;
use std::sync::Arc;
use storage::Storage;
use tracing::info;

/// Core application state shared by the HTTP server and the CLI.
pub struct AppCore {
    pub storage: Arc<Storage>,
    pub checker: BalanceChecker,
    pub refresh_tracker: RefreshTracker,
}

impl AppCore {
    pub async fn new(db_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::with_endpoints(db_path, ProviderEndpoints::default()).await
    }

    pub async fn with_endpoints(
        db_path: impl AsRef<Path>,
        endpoints: ProviderEndpoints,
    ) -> anyhow::Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let storage = Arc::new(Storage::new(db_path)?);

        info!(db_path = %db_path.display(), "Initializing KeyPool");

        Ok(Self {
            storage,
            checker: BalanceChecker::with_endpoints(endpoints),
            refresh_tracker: RefreshTracker::new(),
        })
    }
}
