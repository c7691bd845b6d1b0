//! Typed key pool storage wrapper.

use crate::models::{KeyFilter, KeyPage, PageRequest, StoredKeyRecord};
use anyhow::{Context, Result};
use keypool_storage::PoolEntry;
use redb::Database;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Typed wrapper around keypool-storage::ApiKeyPoolStorage.
#[derive(Debug, Clone)]
pub struct KeyPoolStorage {
    inner: keypool_storage::ApiKeyPoolStorage,
}

impl KeyPoolStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            inner: keypool_storage::ApiKeyPoolStorage::new(db)?,
        })
    }

    fn entry(record: &StoredKeyRecord) -> Result<PoolEntry> {
        Ok(PoolEntry {
            id: record.id.clone(),
            created_at_ms: record.created_at,
            secret: record.key.clone(),
            data: serde_json::to_vec(record)?,
        })
    }

    fn decode(bytes: &[u8]) -> Result<StoredKeyRecord> {
        serde_json::from_slice(bytes).context("Failed to decode key record")
    }

    pub fn insert(&self, record: &StoredKeyRecord) -> Result<()> {
        self.inner.insert(&Self::entry(record)?)
    }

    /// Insert every record in one transaction.
    pub fn insert_batch(&self, records: &[StoredKeyRecord]) -> Result<usize> {
        let entries = records
            .iter()
            .map(Self::entry)
            .collect::<Result<Vec<_>>>()?;
        self.inner.insert_batch(&entries)
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredKeyRecord>> {
        self.inner
            .get_raw(id)?
            .map(|bytes| Self::decode(&bytes))
            .transpose()
    }

    /// Overwrite an existing record. Returns false when the id is unknown.
    pub fn update(&self, record: &StoredKeyRecord) -> Result<bool> {
        let data = serde_json::to_vec(record)?;
        self.inner.update_raw(&record.id, &record.key, &data)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id)
    }

    /// Stored rows for the given raw keys. When several rows share a key the
    /// newest one represents it.
    pub fn existing_by_key<S: AsRef<str>>(
        &self,
        keys: &[S],
    ) -> Result<HashMap<String, StoredKeyRecord>> {
        let mut existing: HashMap<String, StoredKeyRecord> = HashMap::new();
        for (_, bytes) in self.inner.find_by_secrets(keys)? {
            let record = Self::decode(&bytes)?;
            let newer = existing
                .get(&record.key)
                .is_none_or(|current| record.created_at > current.created_at);
            if newer {
                existing.insert(record.key.clone(), record);
            }
        }
        Ok(existing)
    }

    /// Number of records matching the filter.
    pub fn count(&self, filter: &KeyFilter) -> Result<usize> {
        let mut total = 0;
        self.inner.for_each_newest_first(|_, bytes| {
            if filter.matches(&Self::decode(bytes)?) {
                total += 1;
            }
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(total)
    }

    /// Matching records in the page window, newest first.
    pub fn list_range(&self, filter: &KeyFilter, page: PageRequest) -> Result<Vec<StoredKeyRecord>> {
        let offset = page.offset();
        let mut skipped = 0;
        let mut rows = Vec::with_capacity(page.page_size);

        self.inner.for_each_newest_first(|_, bytes| {
            let record = Self::decode(bytes)?;
            if !filter.matches(&record) {
                return Ok(ControlFlow::Continue(()));
            }
            if skipped < offset {
                skipped += 1;
                return Ok(ControlFlow::Continue(()));
            }
            rows.push(record);
            if rows.len() == page.page_size {
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })?;

        Ok(rows)
    }

    /// Count, then fetch the requested window.
    pub fn list(&self, filter: &KeyFilter, page: PageRequest) -> Result<KeyPage<StoredKeyRecord>> {
        let total_count = self.count(filter)?;
        let rows = self.list_range(filter, page)?;

        Ok(KeyPage {
            rows,
            total_count,
            page: page.page,
            page_size: page.page_size,
            page_count: page.page_count(total_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use tempfile::tempdir;

    fn test_storage() -> (KeyPoolStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Arc::new(Database::create(dir.path().join("keypool.db")).unwrap());
        (KeyPoolStorage::new(db).unwrap(), dir)
    }

    fn record(id: &str, provider: Provider, key: &str, created_at: i64) -> StoredKeyRecord {
        StoredKeyRecord {
            id: id.to_string(),
            provider,
            key: key.to_string(),
            balance: Some(1.0),
            currency: Some("CNY".to_string()),
            description: None,
            created_at,
        }
    }

    #[test]
    fn test_second_page_of_45_rows() {
        let (storage, _dir) = test_storage();
        let records: Vec<_> = (0..45)
            .map(|i| record(&format!("id-{i:02}"), Provider::DeepSeek, &format!("sk-{i}"), i))
            .collect();
        storage.insert_batch(&records).unwrap();

        let page = storage
            .list(&KeyFilter::default(), PageRequest::new(2, 20))
            .unwrap();
        assert_eq!(page.total_count, 45);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.rows.len(), 20);
        // newest first: created_at 44 is row 0, so offset 20 starts at 24
        assert_eq!(page.rows[0].created_at, 24);
        assert_eq!(page.rows[19].created_at, 5);

        let last = storage
            .list(&KeyFilter::default(), PageRequest::new(3, 20))
            .unwrap();
        assert_eq!(last.rows.len(), 5);

        let past_end = storage
            .list(&KeyFilter::default(), PageRequest::new(9, 20))
            .unwrap();
        assert!(past_end.rows.is_empty());
        assert_eq!(past_end.page, 9);
    }

    #[test]
    fn test_filter_applies_to_count_and_rows() {
        let (storage, _dir) = test_storage();
        storage
            .insert_batch(&[
                record("a", Provider::DeepSeek, "sk-ABC-1", 1),
                record("b", Provider::Qwen, "sk-abc-2", 2),
                record("c", Provider::DeepSeek, "sk-xyz", 3),
            ])
            .unwrap();

        let filter = KeyFilter::new(Some(Provider::DeepSeek), Some("abc".to_string()));
        let page = storage.list(&filter, PageRequest::new(1, 10)).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.rows[0].id, "a");

        let empty = storage
            .list(&KeyFilter::new(Some(Provider::OpenAI), None), PageRequest::new(1, 10))
            .unwrap();
        assert_eq!(empty.total_count, 0);
        assert_eq!(empty.page_count, 0);
    }

    #[test]
    fn test_existing_by_key_prefers_newest_row() {
        let (storage, _dir) = test_storage();
        let mut older = record("old", Provider::DeepSeek, "sk-dup", 1);
        older.balance = Some(1.0);
        let mut newer = record("new", Provider::DeepSeek, "sk-dup", 2);
        newer.balance = Some(2.0);
        storage.insert_batch(&[older, newer]).unwrap();

        let existing = storage.existing_by_key(&["sk-dup", "sk-none"]).unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing["sk-dup"].id, "new");
    }

    #[test]
    fn test_update_and_delete() {
        let (storage, _dir) = test_storage();
        let mut row = record("a", Provider::Qwen, "sk-1", 1);
        storage.insert(&row).unwrap();

        row.balance = Some(42.0);
        assert!(storage.update(&row).unwrap());
        assert_eq!(storage.get("a").unwrap().unwrap().balance, Some(42.0));

        assert!(storage.delete("a").unwrap());
        assert!(storage.get("a").unwrap().is_none());
        assert!(!storage.update(&row).unwrap());
    }
}
