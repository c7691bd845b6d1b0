//! Builds the embedded KeyPool core for commands that run without a server.

use anyhow::Result;
use keypool_core::{AppCore, paths};
use std::sync::Arc;

pub async fn prepare_core(db_path: Option<String>) -> Result<Arc<AppCore>> {
    let db_path = match db_path {
        Some(path) => path.into(),
        None => paths::ensure_database_path()?,
    };
    Ok(Arc::new(AppCore::new(&db_path).await?))
}
