use super::{AuthScheme, BalanceAdapter, get_json, join_url, number_at};
use crate::error::Result;
use crate::models::{NormalizedBalance, Provider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const BALANCE_PATH: &str = "/api/v3/billing/balance";

/// Volcengine takes the key as the raw `Authorization` value, without a scheme.
pub struct VolcengineAdapter {
    base_url: String,
}

impl VolcengineAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    pub fn normalize(payload: &Value) -> NormalizedBalance {
        NormalizedBalance {
            balance: number_at(payload, "/AvailableBalance"),
            total: number_at(payload, "/TotalBalance"),
            used: None,
            currency: Provider::Volcengine.currency().to_string(),
            details: payload.clone(),
        }
    }
}

#[async_trait]
impl BalanceAdapter for VolcengineAdapter {
    fn provider(&self) -> Provider {
        Provider::Volcengine
    }

    async fn check(&self, client: &Client, api_key: &str) -> Result<NormalizedBalance> {
        let url = join_url(&self.base_url, BALANCE_PATH);
        let payload = get_json(client, Provider::Volcengine, &url, AuthScheme::Raw, api_key).await?;
        Ok(Self::normalize(&payload))
    }
}
