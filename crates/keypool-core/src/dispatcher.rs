//! Batch balance queries.

use crate::error::{BalanceError, Result};
use crate::models::{Provider, QueryResult};
use crate::providers::BalanceChecker;
use futures::future::join_all;
use tracing::info;

/// Split pasted text into keys: newline or comma separated, trimmed, blanks dropped.
///
/// Order is kept and duplicates are not removed.
pub fn parse_keys(raw: &str) -> Vec<String> {
    raw.split(['\n', ','])
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the provider tag and the pasted keys, then check every key at once.
pub async fn query_many(checker: &BalanceChecker, raw: &str, provider: &str) -> Result<Vec<QueryResult>> {
    let provider: Provider = provider.parse()?;
    query_keys(checker, provider, parse_keys(raw)).await
}

/// Check already-split keys concurrently. Output order matches input order.
///
/// A failed key becomes an `error` result; it never fails the batch.
pub async fn query_keys(
    checker: &BalanceChecker,
    provider: Provider,
    keys: Vec<String>,
) -> Result<Vec<QueryResult>> {
    let keys: Vec<String> = keys
        .into_iter()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .collect();
    if keys.is_empty() {
        return Err(BalanceError::validation("Enter at least one API key"));
    }

    let mut results: Vec<QueryResult> = keys
        .iter()
        .map(|key| QueryResult::loading(key.as_str(), provider))
        .collect();

    let outcomes = join_all(keys.iter().map(|key| checker.check(provider, key))).await;
    for (slot, outcome) in results.iter_mut().zip(outcomes) {
        slot.resolve(outcome);
    }

    let succeeded = results.iter().filter(|result| result.is_success()).count();
    info!(
        provider = %provider,
        total = results.len(),
        succeeded,
        "Balance query finished"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryStatus;
    use crate::providers::ProviderEndpoints;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_keys_splits_trims_and_drops_blanks() {
        assert_eq!(parse_keys("a,  b\nc ,,"), vec!["a", "b", "c"]);
        assert_eq!(parse_keys("k1\r\nk1\n"), vec!["k1", "k1"]);
        assert!(parse_keys(" , \n ").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_provider_fails_before_parsing_keys() {
        let checker = BalanceChecker::with_endpoints(ProviderEndpoints::all_at("http://127.0.0.1:1"));
        let err = query_many(&checker, "sk-1", "anthropic").await.unwrap_err();
        assert!(matches!(err, BalanceError::UnsupportedProvider(_)));
    }

    #[tokio::test]
    async fn test_empty_input_is_validation_error() {
        let checker = BalanceChecker::with_endpoints(ProviderEndpoints::all_at("http://127.0.0.1:1"));
        let err = query_many(&checker, " ,\n", "deepseek").await.unwrap_err();
        assert!(matches!(err, BalanceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_results_keep_input_order_despite_latency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/balance"))
            .and(header("authorization", "Bearer slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(300))
                    .set_body_json(json!({"balance_infos": [{"total_balance": "1"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/balance"))
            .and(header("authorization", "Bearer fast"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"balance_infos": [{"total_balance": "2"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/balance"))
            .and(header("authorization", "Bearer bad"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let checker = BalanceChecker::with_endpoints(ProviderEndpoints::all_at(server.uri()));
        let results = query_many(&checker, "slow\nbad, fast", "deepseek")
            .await
            .unwrap();

        let keys: Vec<&str> = results.iter().map(|r| r.api_key.as_str()).collect();
        assert_eq!(keys, vec!["slow", "bad", "fast"]);
        assert_eq!(results[0].balance, Some(1.0));
        assert_eq!(results[1].status, QueryStatus::Error);
        assert_eq!(results[1].error.as_deref(), Some("DeepSeek API error: 401"));
        assert_eq!(results[2].balance, Some(2.0));
        assert!(results.iter().all(|r| r.status != QueryStatus::Loading));
    }
}
