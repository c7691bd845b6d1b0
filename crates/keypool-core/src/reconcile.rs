//! Merge a batch of fresh lookups into the stored key pool.
//!
//! Only successful results with a balance above [`LOW_BALANCE_THRESHOLD`] are
//! candidates. A candidate whose key is already stored becomes an update when
//! its balance or currency differs (exact comparison) and is left alone
//! otherwise; unknown keys are inserted.

use crate::models::{Provider, QueryResult, StoredKeyRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Balances at or below this are not worth sharing.
pub const LOW_BALANCE_THRESHOLD: f64 = 0.1;

/// A new key to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInsert {
    pub provider: Provider,
    pub key: String,
    pub balance: f64,
    pub currency: Option<String>,
}

/// A stored row whose balance or currency changed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub id: String,
    pub key: String,
    pub balance: f64,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub to_insert: Vec<PendingInsert>,
    pub to_update: Vec<PendingUpdate>,
    pub unchanged: usize,
    pub skipped_low_balance: usize,
    pub duplicates: usize,
}

impl ReconcilePlan {
    /// `existing_by_key` maps a raw key to the stored row that represents it.
    pub fn build(results: &[QueryResult], existing_by_key: &HashMap<String, StoredKeyRecord>) -> Self {
        let mut plan = Self::default();
        let mut seen = HashSet::new();

        for result in results.iter().filter(|result| result.is_success()) {
            let balance = result.balance.unwrap_or(0.0);
            if balance <= LOW_BALANCE_THRESHOLD {
                plan.skipped_low_balance += 1;
                continue;
            }
            if !seen.insert(result.api_key.as_str()) {
                plan.duplicates += 1;
                continue;
            }

            match existing_by_key.get(&result.api_key) {
                Some(existing) => {
                    if existing.balance != Some(balance) || existing.currency != result.currency {
                        plan.to_update.push(PendingUpdate {
                            id: existing.id.clone(),
                            key: result.api_key.clone(),
                            balance,
                            currency: result.currency.clone(),
                        });
                    } else {
                        plan.unchanged += 1;
                    }
                }
                None => plan.to_insert.push(PendingInsert {
                    provider: result.provider,
                    key: result.api_key.clone(),
                    balance,
                    currency: result.currency.clone(),
                }),
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty()
    }

    pub fn preview(&self) -> SavePreview {
        SavePreview {
            to_insert: self.to_insert.len(),
            to_update: self.to_update.len(),
            unchanged: self.unchanged,
            skipped_low_balance: self.skipped_low_balance,
            duplicates: self.duplicates,
        }
    }
}

/// Counts of what a save would do, computed without writing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePreview {
    pub to_insert: usize,
    pub to_update: usize,
    pub unchanged: usize,
    pub skipped_low_balance: usize,
    pub duplicates: usize,
}

/// Counts of what a save did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub update_failed: usize,
    pub unchanged: usize,
    pub skipped_low_balance: usize,
    pub duplicates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedBalance;
    use serde_json::Value;

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

    fn stored(id: &str, key: &str, balance: f64) -> StoredKeyRecord {
        StoredKeyRecord {
            id: id.to_string(),
            provider: Provider::DeepSeek,
            key: key.to_string(),
            balance: Some(balance),
            currency: Some("CNY".to_string()),
            description: None,
            created_at: 0,
        }
    }

    fn existing(records: &[StoredKeyRecord]) -> HashMap<String, StoredKeyRecord> {
        records
            .iter()
            .map(|record| (record.key.clone(), record.clone()))
            .collect()
    }

    #[test]
    fn test_low_balance_boundary() {
        let plan = ReconcilePlan::build(
            &[success("at", 0.1), success("above", 0.10001), success("zero", 0.0)],
            &HashMap::new(),
        );
        assert_eq!(plan.skipped_low_balance, 2);
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert[0].key, "above");
    }

    #[test]
    fn test_same_balance_is_unchanged_and_new_balance_is_update() {
        let stored_rows = existing(&[stored("r1", "k1", 5.0)]);

        let same = ReconcilePlan::build(&[success("k1", 5.0)], &stored_rows);
        assert_eq!(same.unchanged, 1);
        assert!(same.is_empty());

        let changed = ReconcilePlan::build(&[success("k1", 7.0)], &stored_rows);
        assert_eq!(changed.unchanged, 0);
        assert_eq!(
            changed.to_update,
            vec![PendingUpdate {
                id: "r1".to_string(),
                key: "k1".to_string(),
                balance: 7.0,
                currency: Some("CNY".to_string()),
            }]
        );
    }

    #[test]
    fn test_currency_change_is_update() {
        let mut row = stored("r1", "k1", 5.0);
        row.currency = None;
        let plan = ReconcilePlan::build(&[success("k1", 5.0)], &existing(&[row]));
        assert_eq!(plan.to_update.len(), 1);
    }

    #[test]
    fn test_unknown_key_is_inserted() {
        let plan = ReconcilePlan::build(&[success("new", 0.2)], &existing(&[stored("r1", "k1", 5.0)]));
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert[0].balance, 0.2);
        assert_eq!(plan.to_insert[0].currency.as_deref(), Some("CNY"));
    }

    #[test]
    fn test_errors_are_ignored_and_duplicates_collapse() {
        let results = vec![
            QueryResult::failure("bad", Provider::DeepSeek, "DeepSeek API error: 401"),
            success("k", 3.0),
            success("k", 4.0),
        ];
        let plan = ReconcilePlan::build(&results, &HashMap::new());
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert[0].balance, 3.0);
        assert_eq!(plan.duplicates, 1);
        assert_eq!(plan.skipped_low_balance, 0);

        let preview = plan.preview();
        assert_eq!(preview.to_insert, 1);
        assert_eq!(preview.duplicates, 1);
    }
}
