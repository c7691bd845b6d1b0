//! Local log of past lookups, kept apart from the shared pool.
//!
//! The log is one JSON document rewritten on every save (read, merge,
//! truncate, write). Entries are stored newest first and capped at
//! [`HISTORY_LIMIT`].

use crate::models::{QueryResult, QueryStatus};
use anyhow::{Context, Result};
use keypool_storage::time_utils;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub result: QueryResult,
    /// When the lookup finished, in milliseconds since the epoch.
    pub timestamp: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryDocument {
    #[serde(default)]
    balance_check_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Entries newest first. A missing or unreadable file is an empty history.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str::<HistoryDocument>(&content) {
            Ok(document) => document.balance_check_history,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Ignoring corrupt history file");
                Vec::new()
            }
        }
    }

    /// Prepend the finished results of one batch, keeping their batch order.
    ///
    /// Returns the number of entries kept after truncation.
    pub fn record(&self, results: &[QueryResult]) -> Result<usize> {
        let timestamp = time_utils::now_ms();
        let mut entries: Vec<HistoryEntry> = results
            .iter()
            .filter(|result| result.status != QueryStatus::Loading)
            .map(|result| HistoryEntry {
                result: result.clone(),
                timestamp,
            })
            .collect();
        if entries.is_empty() {
            return Ok(self.load().len());
        }

        entries.extend(self.load());
        entries.truncate(HISTORY_LIMIT);
        self.write(entries)
    }

    pub fn clear(&self) -> Result<()> {
        self.write(Vec::new()).map(|_| ())
    }

    fn write(&self, entries: Vec<HistoryEntry>) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let count = entries.len();
        let document = HistoryDocument {
            balance_check_history: entries,
        };
        let json = serde_json::to_string_pretty(&document)?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(count, "History saved");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use tempfile::tempdir;

    fn result(key: &str) -> QueryResult {
        QueryResult::failure(key, Provider::Qwen, "Qwen API error: 401")
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("balance_history.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_history_is_capped_newest_first() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("balance_history.json"));

        for i in 0..51 {
            store.record(&[result(&format!("key-{i}"))]).unwrap();
        }

        let entries = store.load();
        assert_eq!(entries.len(), HISTORY_LIMIT);
        assert_eq!(entries[0].result.api_key, "key-50");
        assert_eq!(entries[49].result.api_key, "key-1");
    }

    #[test]
    fn test_batch_keeps_order_and_skips_loading() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.json"));

        store.record(&[result("old")]).unwrap();
        store
            .record(&[
                result("a"),
                QueryResult::loading("pending", Provider::Qwen),
                result("b"),
            ])
            .unwrap();

        let keys: Vec<String> = store
            .load()
            .into_iter()
            .map(|entry| entry.result.api_key)
            .collect();
        assert_eq!(keys, vec!["a", "b", "old"]);
    }

    #[test]
    fn test_clear_and_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("balance_history.json");
        let store = HistoryStore::new(&path);

        store.record(&[result("a")]).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());

        fs::write(&path, "{not json").unwrap();
        assert!(store.load().is_empty());
        assert_eq!(store.record(&[result("b")]).unwrap(), 1);
    }

    #[test]
    fn test_document_uses_namespace_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("balance_history.json");
        let store = HistoryStore::new(&path);
        store.record(&[result("a")]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["balance_check_history"][0]["apiKey"], "a");
        assert!(value["balance_check_history"][0]["timestamp"].is_i64());
    }
}
