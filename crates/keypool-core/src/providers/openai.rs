use super::{AuthScheme, BalanceAdapter, get_json, join_url, number_at};
use crate::error::Result;
use crate::models::{NormalizedBalance, Provider};
use async_trait::async_trait;
use chrono::{Datelike, Months, NaiveDate, Utc};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use tracing::warn;

const SUBSCRIPTION_PATH: &str = "/v1/dashboard/billing/subscription";
const USAGE_PATH: &str = "/v1/dashboard/billing/usage";

/// OpenAI needs two calls: the hard limit from the subscription, then this
/// month's usage. Usage is reported in cents.
pub struct OpenAIAdapter {
    base_url: String,
}

impl OpenAIAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    pub fn normalize(subscription: &Value, usage: &Value) -> NormalizedBalance {
        let total = number_at(subscription, "/hard_limit_usd");
        let used = number_at(usage, "/total_usage") / 100.0;

        NormalizedBalance {
            balance: total - used,
            total,
            used: Some(used),
            currency: Provider::OpenAI.currency().to_string(),
            details: json!({
                "subscription": subscription,
                "usage": usage,
            }),
        }
    }

    fn usage_url(&self, today: NaiveDate) -> String {
        let (start, end) = month_window(today);
        format!(
            "{}?start_date={}&end_date={}",
            join_url(&self.base_url, USAGE_PATH),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        )
    }

    /// Usage failures are not fatal; the check reports zero usage instead.
    async fn fetch_usage(&self, client: &Client, api_key: &str) -> Result<Value> {
        let response = client
            .get(self.usage_url(Utc::now().date_naive()))
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "OpenAI usage request failed, assuming zero usage");
            return Ok(Value::Null);
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_else(|err| {
            warn!(error = %err, "OpenAI usage response is not JSON, assuming zero usage");
            Value::Null
        }))
    }
}

/// First and last day of the calendar month containing `today`.
pub(crate) fn month_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.with_day(1).unwrap_or(today);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(today);
    (start, end)
}

#[async_trait]
impl BalanceAdapter for OpenAIAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn check(&self, client: &Client, api_key: &str) -> Result<NormalizedBalance> {
        let url = join_url(&self.base_url, SUBSCRIPTION_PATH);
        let subscription =
            get_json(client, Provider::OpenAI, &url, AuthScheme::Bearer, api_key).await?;
        let usage = self.fetch_usage(client, api_key).await?;
        Ok(Self::normalize(&subscription, &usage))
    }
}
