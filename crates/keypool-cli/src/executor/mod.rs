use anyhow::Result;
use async_trait::async_trait;
use keypool_core::models::{
    AdminKeyRow, KeyListQuery, KeyPage, KeyRecordPatch, NewKeyRecord, QueryResult, SharedKeyRow,
    StoredKeyRecord,
};
use keypool_core::reconcile::{SavePreview, SaveSummary};
use keypool_core::services::keys::BulkRefreshSummary;
use std::sync::Arc;

pub mod direct;
pub mod http;

/// Operations the commands need, served either in-process or by a server.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn query(&self, provider: &str, keys: Vec<String>) -> Result<Vec<QueryResult>>;

    async fn preview_save(&self, results: &[QueryResult]) -> Result<SavePreview>;

    async fn save_results(&self, results: &[QueryResult]) -> Result<SaveSummary>;

    async fn list_shared(&self, query: &KeyListQuery) -> Result<KeyPage<SharedKeyRow>>;

    async fn add_key(&self, new: NewKeyRecord) -> Result<SharedKeyRow>;

    async fn list_admin(&self, query: &KeyListQuery) -> Result<KeyPage<AdminKeyRow>>;

    async fn update_key(&self, id: &str, patch: KeyRecordPatch) -> Result<StoredKeyRecord>;

    async fn delete_key(&self, id: &str) -> Result<()>;

    async fn refresh_key(&self, id: &str) -> Result<StoredKeyRecord>;

    async fn refresh_keys(&self, ids: &[String]) -> Result<BulkRefreshSummary>;
}

/// Talk to `server` when one is configured, otherwise open the local database.
pub async fn create(
    server: Option<String>,
    token: Option<String>,
    db_path: Option<String>,
) -> Result<Arc<dyn CommandExecutor>> {
    match server {
        Some(url) => {
            tracing::debug!(server = %url, "Using remote KeyPool server");
            Ok(Arc::new(http::HttpExecutor::new(url, token)?))
        }
        None => Ok(Arc::new(direct::DirectExecutor::connect(db_path).await?)),
    }
}
