use crate::AppCore;
use crate::error::{BalanceError, Result};
use crate::models::{
    ADMIN_PAGE_SIZE, AdminKeyRow, KeyListQuery, KeyPage, KeyRecordPatch, NewKeyRecord,
    QueryResult, SHARED_PAGE_SIZE, SharedKeyRow, StoredKeyRecord, mask_key,
};
use crate::reconcile::{ReconcilePlan, SavePreview, SaveSummary};
use anyhow::Context;
use futures::future::join_all;
use keypool_storage::time_utils;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Public listing with masked keys.
pub async fn list_shared(core: &Arc<AppCore>, query: &KeyListQuery) -> Result<KeyPage<SharedKeyRow>> {
    let page = core
        .storage
        .keys
        .list(&query.filter(), query.page_request(SHARED_PAGE_SIZE))
        .context("Failed to list keys")?;
    Ok(page.map(SharedKeyRow::from))
}

/// Admin listing with full keys and refresh markers.
pub async fn list_admin(core: &Arc<AppCore>, query: &KeyListQuery) -> Result<KeyPage<AdminKeyRow>> {
    let page = core
        .storage
        .keys
        .list(&query.filter(), query.page_request(ADMIN_PAGE_SIZE))
        .context("Failed to list keys")?;
    Ok(page.map(|record| AdminKeyRow {
        refreshing: core.refresh_tracker.is_refreshing(&record.id),
        record,
    }))
}

/// Add a key by hand. No uniqueness check is made.
pub async fn add_key(core: &Arc<AppCore>, new: NewKeyRecord) -> Result<StoredKeyRecord> {
    let record = new.into_record(Uuid::new_v4().to_string(), time_utils::now_ms())?;
    core.storage
        .keys
        .insert(&record)
        .context("Failed to add key")?;

    info!(id = %record.id, provider = %record.provider, key = %mask_key(&record.key), "Key added");
    Ok(record)
}

pub async fn get_key(core: &Arc<AppCore>, id: &str) -> Result<StoredKeyRecord> {
    core.storage
        .keys
        .get(id)
        .with_context(|| format!("Failed to get key {}", id))?
        .ok_or_else(|| BalanceError::NotFound(format!("Key {id}")))
}

pub async fn update_key(
    core: &Arc<AppCore>,
    id: &str,
    patch: KeyRecordPatch,
) -> Result<StoredKeyRecord> {
    if patch.is_empty() {
        return Err(BalanceError::validation("Nothing to update"));
    }

    let mut record = get_key(core, id).await?;
    patch.apply(&mut record)?;

    let updated = core
        .storage
        .keys
        .update(&record)
        .with_context(|| format!("Failed to update key {}", id))?;
    if !updated {
        return Err(BalanceError::NotFound(format!("Key {id}")));
    }

    info!(id, "Key updated");
    Ok(record)
}

pub async fn delete_key(core: &Arc<AppCore>, id: &str) -> Result<()> {
    let deleted = core
        .storage
        .keys
        .delete(id)
        .with_context(|| format!("Failed to delete key {}", id))?;
    if !deleted {
        return Err(BalanceError::NotFound(format!("Key {id}")));
    }

    info!(id, "Key deleted");
    Ok(())
}

/// Reconcile fresh results against the stored rows for the same keys.
pub async fn plan_save(core: &Arc<AppCore>, results: &[QueryResult]) -> Result<ReconcilePlan> {
    let keys: Vec<&str> = results
        .iter()
        .filter(|result| result.is_success())
        .map(|result| result.api_key.as_str())
        .collect();
    let existing = core
        .storage
        .keys
        .existing_by_key(&keys)
        .context("Failed to look up existing keys")?;

    Ok(ReconcilePlan::build(results, &existing))
}

/// What a save would do, without writing anything.
pub async fn preview_save(core: &Arc<AppCore>, results: &[QueryResult]) -> Result<SavePreview> {
    Ok(plan_save(core, results).await?.preview())
}

/// Plan a save against the current pool, then apply it.
pub async fn save_results(core: &Arc<AppCore>, results: &[QueryResult]) -> Result<SaveSummary> {
    let plan = plan_save(core, results).await?;
    apply_plan(core, plan).await
}

/// Insert new keys in one transaction, then update changed rows concurrently.
///
/// Each update stands alone: a failed update is counted and the others still
/// land. A failed insert fails the whole save before any update is attempted.
pub async fn apply_plan(core: &Arc<AppCore>, plan: ReconcilePlan) -> Result<SaveSummary> {
    let mut summary = SaveSummary {
        unchanged: plan.unchanged,
        skipped_low_balance: plan.skipped_low_balance,
        duplicates: plan.duplicates,
        ..SaveSummary::default()
    };

    let created_at = time_utils::now_ms();
    let records: Vec<StoredKeyRecord> = plan
        .to_insert
        .into_iter()
        .map(|pending| StoredKeyRecord {
            id: Uuid::new_v4().to_string(),
            provider: pending.provider,
            key: pending.key,
            balance: Some(pending.balance),
            currency: pending.currency,
            description: None,
            created_at,
        })
        .collect();
    summary.inserted = core
        .storage
        .keys
        .insert_batch(&records)
        .context("Failed to insert keys")?;

    let outcomes = join_all(plan.to_update.iter().map(|pending| async move {
        core.storage.keys.get(&pending.id).and_then(|record| {
            let Some(mut record) = record else {
                return Ok(false);
            };
            record.balance = Some(pending.balance);
            record.currency = pending.currency.clone();
            core.storage.keys.update(&record)
        })
    }))
    .await;

    for (pending, outcome) in plan.to_update.iter().zip(outcomes) {
        match outcome {
            Ok(true) => summary.updated += 1,
            Ok(false) => {
                warn!(id = %pending.id, "Key disappeared before its balance could be updated");
                summary.update_failed += 1;
            }
            Err(err) => {
                warn!(id = %pending.id, key = %mask_key(&pending.key), error = %err, "Failed to update key balance");
                summary.update_failed += 1;
            }
        }
    }

    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        update_failed = summary.update_failed,
        unchanged = summary.unchanged,
        skipped_low_balance = summary.skipped_low_balance,
        "Saved balance results"
    );
    Ok(summary)
}

/// Re-check one stored key and write back its balance and currency.
///
/// On failure the row is left as it was.
pub async fn refresh_key(core: &Arc<AppCore>, id: &str) -> Result<StoredKeyRecord> {
    let record = get_key(core, id).await?;
    let _guard = core.refresh_tracker.begin(id);

    let balance = core
        .checker
        .check(record.provider, &record.key)
        .await
        .inspect_err(|err| warn!(id, error = %err, "Balance refresh failed"))?;

    // The row may have been edited while the check was running.
    let mut current = get_key(core, id).await?;
    current.balance = Some(balance.balance);
    current.currency = Some(balance.currency);
    let updated = core
        .storage
        .keys
        .update(&current)
        .with_context(|| format!("Failed to update key {}", id))?;
    if !updated {
        return Err(BalanceError::NotFound(format!("Key {id}")));
    }

    Ok(current)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRefreshSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<RefreshOutcome>,
}

/// Refresh several rows at once. Each row succeeds or fails on its own.
pub async fn refresh_keys(core: &Arc<AppCore>, ids: &[String]) -> BulkRefreshSummary {
    let outcomes = join_all(ids.iter().map(|id| refresh_key(core, id))).await;

    let mut summary = BulkRefreshSummary::default();
    for (id, outcome) in ids.iter().zip(outcomes) {
        let result = match outcome {
            Ok(record) => {
                summary.succeeded += 1;
                RefreshOutcome {
                    id: id.clone(),
                    ok: true,
                    balance: record.balance,
                    currency: record.currency,
                    error: None,
                }
            }
            Err(err) => {
                summary.failed += 1;
                RefreshOutcome {
                    id: id.clone(),
                    ok: false,
                    balance: None,
                    currency: None,
                    error: Some(err.to_string()),
                }
            }
        };
        summary.results.push(result);
    }

    info!(succeeded = summary.succeeded, failed = summary.failed, "Bulk refresh finished");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NormalizedBalance, Provider};
    use crate::providers::ProviderEndpoints;
    use serde_json::{Value, json};
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_core(base_url: &str) -> (Arc<AppCore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let core = AppCore::with_endpoints(
            dir.path().join("keypool.db"),
            ProviderEndpoints::all_at(base_url),
        )
        .await
        .unwrap();
        (Arc::new(core), dir)
    }

    fn success(key: &str, balance: f64) -> QueryResult {
        QueryResult::success(
            key,
            Provider::DeepSeek,
            NormalizedBalance {
                balance,
                total: balance,
                used: None,
                currency: "CNY".to_string(),
                details: Value::Null,
            },
        )
    }

    fn new_key(key: &str) -> NewKeyRecord {
        NewKeyRecord {
            provider: Provider::DeepSeek,
            key: key.to_string(),
            balance: None,
            currency: None,
            description: Some("shared".to_string()),
        }
    }

    #[tokio::test]
    async fn test_save_inserts_updates_and_skips() {
        let (core, _dir) = test_core("http://127.0.0.1:1").await;
        let first = save_results(&core, &[success("k1", 5.0), success("k2", 0.05)])
            .await
            .unwrap();
        assert_eq!(first.inserted, 1);
        assert_eq!(first.skipped_low_balance, 1);

        let preview = preview_save(&core, &[success("k1", 5.0), success("k3", 1.0)])
            .await
            .unwrap();
        assert_eq!(preview.unchanged, 1);
        assert_eq!(preview.to_insert, 1);

        let second = save_results(
            &core,
            &[
                success("k1", 7.0),
                success("k3", 1.0),
                QueryResult::failure("k4", Provider::DeepSeek, "DeepSeek API error: 401"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(second.inserted, 1);
        assert_eq!(second.updated, 1);
        assert_eq!(second.update_failed, 0);

        let page = list_admin(&core, &KeyListQuery::default()).await.unwrap();
        assert_eq!(page.total_count, 2);
        let k1 = page.rows.iter().find(|row| row.record.key == "k1").unwrap();
        assert_eq!(k1.record.balance, Some(7.0));
        assert!(!k1.refreshing);
    }

    #[tokio::test]
    async fn test_failed_update_is_counted_and_others_still_land() {
        let (core, _dir) = test_core("http://127.0.0.1:1").await;
        save_results(&core, &[success("k1", 5.0), success("k2", 5.0)])
            .await
            .unwrap();

        let plan = plan_save(
            &core,
            &[success("k1", 8.0), success("k2", 9.0), success("k3", 2.0)],
        )
        .await
        .unwrap();
        assert_eq!(plan.to_update.len(), 2);
        assert_eq!(plan.to_insert.len(), 1);

        let gone = plan
            .to_update
            .iter()
            .find(|pending| pending.key == "k2")
            .unwrap()
            .id
            .clone();
        delete_key(&core, &gone).await.unwrap();

        let summary = apply_plan(&core, plan).await.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.update_failed, 1);

        let page = list_admin(&core, &KeyListQuery::default()).await.unwrap();
        assert_eq!(page.total_count, 2);
        let k1 = page.rows.iter().find(|row| row.record.key == "k1").unwrap();
        assert_eq!(k1.record.balance, Some(8.0));
        assert!(page.rows.iter().any(|row| row.record.key == "k3"));
        assert!(page.rows.iter().all(|row| row.record.key != "k2"));
    }

    #[tokio::test]
    async fn test_preview_does_not_write() {
        let (core, _dir) = test_core("http://127.0.0.1:1").await;
        preview_save(&core, &[success("k1", 5.0)]).await.unwrap();
        let page = list_shared(&core, &KeyListQuery::default()).await.unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_add_edit_delete() {
        let (core, _dir) = test_core("http://127.0.0.1:1").await;
        let record = add_key(&core, new_key(" sk-manual-0123456789abcdef ")).await.unwrap();
        assert_eq!(record.key, "sk-manual-0123456789abcdef");

        let shared = list_shared(&core, &KeyListQuery::default()).await.unwrap();
        assert_eq!(shared.page_size, SHARED_PAGE_SIZE);
        assert_eq!(shared.rows[0].key_preview, "sk-manual-01...89abcdef");

        let patch = KeyRecordPatch {
            balance: Some(3.0),
            currency: Some("CNY".to_string()),
            ..Default::default()
        };
        let updated = update_key(&core, &record.id, patch).await.unwrap();
        assert_eq!(updated.balance, Some(3.0));
        assert_eq!(updated.created_at, record.created_at);

        delete_key(&core, &record.id).await.unwrap();
        assert!(matches!(
            delete_key(&core, &record.id).await,
            Err(BalanceError::NotFound(_))
        ));
        assert!(matches!(
            update_key(&core, &record.id, KeyRecordPatch {
                balance: Some(1.0),
                ..Default::default()
            })
            .await,
            Err(BalanceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_blank_key() {
        let (core, _dir) = test_core("http://127.0.0.1:1").await;
        assert!(matches!(
            add_key(&core, new_key("  ")).await,
            Err(BalanceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_updates_on_success_and_keeps_row_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/balance"))
            .and(header("authorization", "Bearer sk-good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "balance_infos": [{"total_balance": "9.5"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/balance"))
            .and(header("authorization", "Bearer sk-bad"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (core, _dir) = test_core(&server.uri()).await;
        let good = add_key(&core, new_key("sk-good")).await.unwrap();
        let mut bad_input = new_key("sk-bad");
        bad_input.balance = Some(1.0);
        let bad = add_key(&core, bad_input).await.unwrap();

        let refreshed = refresh_key(&core, &good.id).await.unwrap();
        assert_eq!(refreshed.balance, Some(9.5));
        assert_eq!(refreshed.currency.as_deref(), Some("CNY"));
        assert_eq!(refreshed.description.as_deref(), Some("shared"));

        let err = refresh_key(&core, &bad.id).await.unwrap_err();
        assert_eq!(err.to_string(), "DeepSeek API error: 401");
        assert_eq!(get_key(&core, &bad.id).await.unwrap().balance, Some(1.0));
        assert!(!core.refresh_tracker.is_refreshing(&bad.id));

        let summary = refresh_keys(
            &core,
            &[good.id.clone(), bad.id.clone(), "missing".to_string()],
        )
        .await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.results[0].id, good.id);
        assert!(summary.results[0].ok);
        assert_eq!(summary.results[2].error.as_deref(), Some("Key missing not found"));
    }
}
