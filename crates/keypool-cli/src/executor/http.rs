use super::CommandExecutor;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use keypool_core::models::{
    AdminKeyRow, KeyListQuery, KeyPage, KeyRecordPatch, NewKeyRecord, QueryResult, SharedKeyRow,
    StoredKeyRecord,
};
use keypool_core::reconcile::{SavePreview, SaveSummary};
use keypool_core::services::keys::BulkRefreshSummary;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

/// Runs commands against a KeyPool server's HTTP API.
pub struct HttpExecutor {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpExecutor {
    pub fn new(base_url: String, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn list_url(&self, path: &str, query: &KeyListQuery) -> Result<Url> {
        let raw = self.url(path);
        let mut url = Url::parse(&raw).with_context(|| format!("Invalid server URL: {raw}"))?;
        let params = list_params(query);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn admin(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach KeyPool server at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .or(status.canonical_reason())
                .unwrap_or("request failed");
            bail!("Server returned {}: {}", status.as_u16(), message);
        }

        response
            .json()
            .await
            .context("Failed to decode server response")
    }
}

fn list_params(query: &KeyListQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(provider) = query.provider {
        params.push(("provider", provider.to_string()));
    }
    if let Some(search) = &query.search {
        params.push(("search", search.clone()));
    }
    if let Some(page) = query.page {
        params.push(("page", page.to_string()));
    }
    if let Some(page_size) = query.page_size {
        params.push(("page_size", page_size.to_string()));
    }
    params
}

#[async_trait]
impl CommandExecutor for HttpExecutor {
    async fn query(&self, provider: &str, keys: Vec<String>) -> Result<Vec<QueryResult>> {
        let request = self
            .client
            .post(self.url("/api/query"))
            .json(&json!({ "provider": provider, "keys": keys }));
        self.send(request).await
    }

    async fn preview_save(&self, results: &[QueryResult]) -> Result<SavePreview> {
        let request = self
            .client
            .post(self.url("/api/keys/save/preview"))
            .json(&json!({ "results": results }));
        self.send(request).await
    }

    async fn save_results(&self, results: &[QueryResult]) -> Result<SaveSummary> {
        let request = self
            .client
            .post(self.url("/api/keys/save"))
            .json(&json!({ "results": results }));
        self.send(request).await
    }

    async fn list_shared(&self, query: &KeyListQuery) -> Result<KeyPage<SharedKeyRow>> {
        let url = self.list_url("/api/keys", query)?;
        self.send(self.client.get(url)).await
    }

    async fn add_key(&self, new: NewKeyRecord) -> Result<SharedKeyRow> {
        let request = self.client.post(self.url("/api/keys")).json(&new);
        self.send(request).await
    }

    async fn list_admin(&self, query: &KeyListQuery) -> Result<KeyPage<AdminKeyRow>> {
        let url = self.list_url("/api/admin/keys", query)?;
        self.send(self.admin(self.client.get(url))).await
    }

    async fn update_key(&self, id: &str, patch: KeyRecordPatch) -> Result<StoredKeyRecord> {
        let request = self
            .client
            .put(self.url(&format!("/api/admin/keys/{id}")))
            .json(&patch);
        self.send(self.admin(request)).await
    }

    async fn delete_key(&self, id: &str) -> Result<()> {
        let request = self.client.delete(self.url(&format!("/api/admin/keys/{id}")));
        let _: Value = self.send(self.admin(request)).await?;
        Ok(())
    }

    async fn refresh_key(&self, id: &str) -> Result<StoredKeyRecord> {
        let request = self
            .client
            .post(self.url(&format!("/api/admin/keys/{id}/refresh")));
        self.send(self.admin(request)).await
    }

    async fn refresh_keys(&self, ids: &[String]) -> Result<BulkRefreshSummary> {
        let request = self
            .client
            .post(self.url("/api/admin/keys/refresh"))
            .json(&json!({ "ids": ids }));
        self.send(self.admin(request)).await
    }
}
