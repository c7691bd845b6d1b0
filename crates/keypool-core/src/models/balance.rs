use crate::error::BalanceError;
use crate::models::Provider;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Common balance shape every provider adapter produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBalance {
    pub balance: f64,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<f64>,
    pub currency: String,
    /// Raw provider payload, kept for inspection.
    pub details: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Loading,
    Success,
    Error,
}

/// Outcome of checking one key, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub api_key: String,
    pub provider: Provider,
    pub status: QueryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    pub fn loading(api_key: impl Into<String>, provider: Provider) -> Self {
        Self {
            api_key: api_key.into(),
            provider,
            status: QueryStatus::Loading,
            balance: None,
            total: None,
            used: None,
            currency: None,
            details: None,
            error: None,
        }
    }

    pub fn success(api_key: impl Into<String>, provider: Provider, balance: NormalizedBalance) -> Self {
        let mut result = Self::loading(api_key, provider);
        result.apply_balance(balance);
        result
    }

    pub fn failure(api_key: impl Into<String>, provider: Provider, message: impl Into<String>) -> Self {
        let mut result = Self::loading(api_key, provider);
        result.status = QueryStatus::Error;
        result.error = Some(message.into());
        result
    }

    /// Settle a loading placeholder with the outcome of its check.
    pub fn resolve(&mut self, outcome: Result<NormalizedBalance, BalanceError>) {
        match outcome {
            Ok(balance) => self.apply_balance(balance),
            Err(err) => {
                self.status = QueryStatus::Error;
                self.error = Some(err.to_string());
            }
        }
    }

    fn apply_balance(&mut self, balance: NormalizedBalance) {
        self.status = QueryStatus::Success;
        self.balance = Some(balance.balance);
        self.total = Some(balance.total);
        self.used = balance.used;
        self.currency = Some(balance.currency);
        self.details = Some(balance.details);
        self.error = None;
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

/// Shorten a secret for display and logs: `sk-abcdefghi...wxyz1234`.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    match chars.len() {
        0 => String::new(),
        len if len > 20 => {
            let head: String = chars[..12].iter().collect();
            let tail: String = chars[len - 8..].iter().collect();
            format!("{head}...{tail}")
        }
        len if len > 8 => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[len - 4..].iter().collect();
            format!("{head}...{tail}")
        }
        _ => "****".to_string(),
    }
}
