//! Provider billing adapters.
//!
//! Each adapter knows one vendor's balance endpoint and how to map its JSON
//! payload onto [`NormalizedBalance`]. [`BalanceChecker`] owns the shared HTTP
//! client and picks the adapter for a [`Provider`].

mod deepseek;
mod openai;
mod qwen;
mod siliconflow;
mod volcengine;

pub use deepseek::DeepSeekAdapter;
pub use openai::OpenAIAdapter;
pub use qwen::QwenAdapter;
pub use siliconflow::SiliconFlowAdapter;
pub use volcengine::VolcengineAdapter;

use crate::error::{BalanceError, Result};
use crate::http_client::build_http_client;
use crate::models::{NormalizedBalance, Provider, mask_key};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One provider's balance lookup.
#[async_trait]
pub trait BalanceAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn check(&self, client: &Client, api_key: &str) -> Result<NormalizedBalance>;
}

/// Base URLs of the provider billing APIs. Paths are fixed per adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub deepseek: String,
    pub openai: String,
    pub volcengine: String,
    pub qwen: String,
    pub siliconflow: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            deepseek: "https://api.deepseek.com".to_string(),
            openai: "https://api.openai.com".to_string(),
            volcengine: "https://open.volcengineapi.com".to_string(),
            qwen: "https://dashscope.aliyuncs.com".to_string(),
            siliconflow: "https://api.siliconflow.cn".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Point every provider at the same host, e.g. a local mock server.
    pub fn all_at(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            deepseek: base_url.clone(),
            openai: base_url.clone(),
            volcengine: base_url.clone(),
            qwen: base_url.clone(),
            siliconflow: base_url,
        }
    }

    pub fn with_base_url(mut self, provider: Provider, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        match provider {
            Provider::DeepSeek => self.deepseek = base_url,
            Provider::OpenAI => self.openai = base_url,
            Provider::Volcengine => self.volcengine = base_url,
            Provider::Qwen => self.qwen = base_url,
            Provider::SiliconFlow => self.siliconflow = base_url,
        }
        self
    }

    pub fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::DeepSeek => &self.deepseek,
            Provider::OpenAI => &self.openai,
            Provider::Volcengine => &self.volcengine,
            Provider::Qwen => &self.qwen,
            Provider::SiliconFlow => &self.siliconflow,
        }
    }
}

/// Routes balance checks to the adapter for each provider.
#[derive(Clone)]
pub struct BalanceChecker {
    client: Client,
    adapters: HashMap<Provider, Arc<dyn BalanceAdapter>>,
}

impl BalanceChecker {
    pub fn new() -> Self {
        Self::with_endpoints(ProviderEndpoints::default())
    }

    pub fn with_endpoints(endpoints: ProviderEndpoints) -> Self {
        let adapters: [Arc<dyn BalanceAdapter>; 5] = [
            Arc::new(DeepSeekAdapter::new(&endpoints.deepseek)),
            Arc::new(OpenAIAdapter::new(&endpoints.openai)),
            Arc::new(VolcengineAdapter::new(&endpoints.volcengine)),
            Arc::new(QwenAdapter::new(&endpoints.qwen)),
            Arc::new(SiliconFlowAdapter::new(&endpoints.siliconflow)),
        ];

        Self {
            client: build_http_client(),
            adapters: adapters
                .into_iter()
                .map(|adapter| (adapter.provider(), adapter))
                .collect(),
        }
    }

    /// Check one key. Blank keys are rejected before any request is made.
    pub async fn check(&self, provider: Provider, api_key: &str) -> Result<NormalizedBalance> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(BalanceError::validation("API key is required"));
        }

        let adapter = self
            .adapters
            .get(&provider)
            .ok_or_else(|| BalanceError::UnsupportedProvider(provider.to_string()))?;

        debug!(provider = %provider, key = %mask_key(api_key), "Checking balance");
        adapter.check(&self.client, api_key).await
    }
}

impl Default for BalanceChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// How the key is placed in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthScheme {
    Bearer,
    Raw,
}

impl AuthScheme {
    fn header_value(self, api_key: &str) -> String {
        match self {
            Self::Bearer => format!("Bearer {api_key}"),
            Self::Raw => api_key.to_string(),
        }
    }
}

/// GET a billing endpoint and parse the body as JSON. Non-2xx statuses fail.
pub(crate) async fn get_json(
    client: &Client,
    provider: Provider,
    url: &str,
    auth: AuthScheme,
    api_key: &str,
) -> Result<Value> {
    let response = client
        .get(url)
        .header(AUTHORIZATION, auth.header_value(api_key))
        .header(CONTENT_TYPE, "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(BalanceError::Provider {
            provider,
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| BalanceError::InvalidResponse {
        provider,
        message: err.to_string(),
    })
}

/// Read a number at a JSON pointer. Numeric strings count; anything else is missing.
pub(crate) fn opt_number_at(payload: &Value, pointer: &str) -> Option<f64> {
    let value = payload.pointer(pointer)?;
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

/// Like [`opt_number_at`], with missing values read as `0`.
pub(crate) fn number_at(payload: &Value, pointer: &str) -> f64 {
    opt_number_at(payload, pointer).unwrap_or(0.0)
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
