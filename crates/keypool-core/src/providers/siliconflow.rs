use super::{AuthScheme, BalanceAdapter, get_json, join_url, opt_number_at};
use crate::error::Result;
use crate::models::{NormalizedBalance, Provider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const USER_INFO_PATH: &str = "/v1/user/info";

pub struct SiliconFlowAdapter {
    base_url: String,
}

impl SiliconFlowAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    /// `used` is derived as total minus balance, and is 0 unless both are reported.
    pub fn normalize(payload: &Value) -> NormalizedBalance {
        let balance = opt_number_at(payload, "/data/balance");
        let total = opt_number_at(payload, "/data/totalBalance");
        let used = match (total, balance) {
            (Some(total), Some(balance)) => total - balance,
            _ => 0.0,
        };

        NormalizedBalance {
            balance: balance.unwrap_or(0.0),
            total: total.unwrap_or(0.0),
            used: Some(used),
            currency: Provider::SiliconFlow.currency().to_string(),
            details: payload.clone(),
        }
    }
}

#[async_trait]
impl BalanceAdapter for SiliconFlowAdapter {
    fn provider(&self) -> Provider {
        Provider::SiliconFlow
    }

    async fn check(&self, client: &Client, api_key: &str) -> Result<NormalizedBalance> {
        let url = join_url(&self.base_url, USER_INFO_PATH);
        let payload =
            get_json(client, Provider::SiliconFlow, &url, AuthScheme::Bearer, api_key).await?;
        Ok(Self::normalize(&payload))
    }
}
