use super::{AuthScheme, BalanceAdapter, get_json, join_url, number_at};
use crate::error::Result;
use crate::models::{NormalizedBalance, Provider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const BALANCE_PATH: &str = "/user/balance";

/// DeepSeek reports the remaining balance only, so it doubles as the total.
pub struct DeepSeekAdapter {
    base_url: String,
}

impl DeepSeekAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    pub fn normalize(payload: &Value) -> NormalizedBalance {
        let balance = number_at(payload, "/balance_infos/0/total_balance");
        NormalizedBalance {
            balance,
            total: balance,
            used: None,
            currency: Provider::DeepSeek.currency().to_string(),
            details: payload.clone(),
        }
    }
}

#[async_trait]
impl BalanceAdapter for DeepSeekAdapter {
    fn provider(&self) -> Provider {
        Provider::DeepSeek
    }

    async fn check(&self, client: &Client, api_key: &str) -> Result<NormalizedBalance> {
        let url = join_url(&self.base_url, BALANCE_PATH);
        let payload = get_json(client, Provider::DeepSeek, &url, AuthScheme::Bearer, api_key).await?;
        Ok(Self::normalize(&payload))
    }
}
