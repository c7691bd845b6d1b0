use super::CommandExecutor;
use crate::setup::prepare_core;
use anyhow::Result;
use async_trait::async_trait;
use keypool_core::AppCore;
use keypool_core::models::{
    AdminKeyRow, KeyListQuery, KeyPage, KeyRecordPatch, NewKeyRecord, QueryResult, SharedKeyRow,
    StoredKeyRecord,
};
use keypool_core::reconcile::{SavePreview, SaveSummary};
use keypool_core::services::balance as balance_service;
use keypool_core::services::keys::{self as keys_service, BulkRefreshSummary};
use std::sync::Arc;

/// Runs every command against an in-process core and the local database.
pub struct DirectExecutor {
    core: Arc<AppCore>,
}

impl DirectExecutor {
    pub async fn connect(db_path: Option<String>) -> Result<Self> {
        let core = prepare_core(db_path).await?;
        Ok(Self { core })
    }
}

#[async_trait]
impl CommandExecutor for DirectExecutor {
    async fn query(&self, provider: &str, keys: Vec<String>) -> Result<Vec<QueryResult>> {
        Ok(balance_service::query_keys(&self.core, provider, &keys).await?)
    }

    async fn preview_save(&self, results: &[QueryResult]) -> Result<SavePreview> {
        Ok(keys_service::preview_save(&self.core, results).await?)
    }

    async fn save_results(&self, results: &[QueryResult]) -> Result<SaveSummary> {
        Ok(keys_service::save_results(&self.core, results).await?)
    }

    async fn list_shared(&self, query: &KeyListQuery) -> Result<KeyPage<SharedKeyRow>> {
        Ok(keys_service::list_shared(&self.core, query).await?)
    }

    async fn add_key(&self, new: NewKeyRecord) -> Result<SharedKeyRow> {
        Ok(keys_service::add_key(&self.core, new).await?.into())
    }

    async fn list_admin(&self, query: &KeyListQuery) -> Result<KeyPage<AdminKeyRow>> {
        Ok(keys_service::list_admin(&self.core, query).await?)
    }

    async fn update_key(&self, id: &str, patch: KeyRecordPatch) -> Result<StoredKeyRecord> {
        Ok(keys_service::update_key(&self.core, id, patch).await?)
    }

    async fn delete_key(&self, id: &str) -> Result<()> {
        Ok(keys_service::delete_key(&self.core, id).await?)
    }

    async fn refresh_key(&self, id: &str) -> Result<StoredKeyRecord> {
        Ok(keys_service::refresh_key(&self.core, id).await?)
    }

    async fn refresh_keys(&self, ids: &[String]) -> Result<BulkRefreshSummary> {
        Ok(keys_service::refresh_keys(&self.core, ids).await)
    }
}
