use super::{AuthScheme, BalanceAdapter, get_json, join_url, number_at};
use crate::error::Result;
use crate::models::{NormalizedBalance, Provider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const BALANCE_PATH: &str = "/api/v1/balance";

pub struct QwenAdapter {
    base_url: String,
}

impl QwenAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    pub fn normalize(payload: &Value) -> NormalizedBalance {
        NormalizedBalance {
            balance: number_at(payload, "/data/available_amount"),
            total: number_at(payload, "/data/total_amount"),
            used: Some(number_at(payload, "/data/used_amount")),
            currency: Provider::Qwen.currency().to_string(),
            details: payload.clone(),
        }
    }
}

#[async_trait]
impl BalanceAdapter for QwenAdapter {
    fn provider(&self) -> Provider {
        Provider::Qwen
    }

    async fn check(&self, client: &Client, api_key: &str) -> Result<NormalizedBalance> {
        let url = join_url(&self.base_url, BALANCE_PATH);
        let payload = get_json(client, Provider::Qwen, &url, AuthScheme::Bearer, api_key).await?;
        Ok(Self::normalize(&payload))
    }
}
