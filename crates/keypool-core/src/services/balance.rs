use crate::AppCore;
use crate::dispatcher;
use crate::error::{BalanceError, Result};
use crate::models::{NormalizedBalance, Provider, QueryResult};
use std::sync::Arc;

/// Check a single key. Both fields are required; the provider must be known.
pub async fn check_balance(
    core: &Arc<AppCore>,
    provider: &str,
    api_key: &str,
) -> Result<NormalizedBalance> {
    if provider.trim().is_empty() || api_key.trim().is_empty() {
        return Err(BalanceError::validation("provider and apiKey are required"));
    }

    let provider: Provider = provider.trim().parse()?;
    core.checker.check(provider, api_key).await
}

/// Check a batch of keys. Each entry may itself hold several newline or
/// comma separated keys.
pub async fn query_keys(
    core: &Arc<AppCore>,
    provider: &str,
    keys: &[String],
) -> Result<Vec<QueryResult>> {
    dispatcher::query_many(&core.checker, &keys.join("\n"), provider.trim()).await
}
