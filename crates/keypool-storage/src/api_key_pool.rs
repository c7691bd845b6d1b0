//! API key pool storage - the shared table of saved provider keys.
//!
//! Records are opaque bytes keyed by id. Two indexes are maintained next to
//! the data: a reverse-timestamp index for newest-first scans and a secret
//! index for existence checks by raw key. The raw key is not unique; several
//! records may share one.

use crate::range_utils::{created_index_key, prefix_range, secret_index_key, secret_prefix};
use anyhow::{Result, anyhow};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
    WriteTransaction,
};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

const KEY_DATA: TableDefinition<&str, &[u8]> = TableDefinition::new("api_key_pool:data");
const CREATED_INDEX: TableDefinition<&str, &str> = TableDefinition::new("api_key_pool:created");
const SECRET_INDEX: TableDefinition<&str, &str> = TableDefinition::new("api_key_pool:secret");
const KEY_META: TableDefinition<&str, &str> = TableDefinition::new("api_key_pool:meta");

/// A record ready to be written, with the fields the indexes are built from.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub id: String,
    pub created_at_ms: i64,
    pub secret: String,
    pub data: Vec<u8>,
}

/// API key pool storage with byte-level API
#[derive(Debug, Clone)]
pub struct ApiKeyPoolStorage {
    db: Arc<Database>,
}

struct PoolTables<'txn> {
    data: Table<'txn, &'static str, &'static [u8]>,
    created: Table<'txn, &'static str, &'static str>,
    secrets: Table<'txn, &'static str, &'static str>,
    meta: Table<'txn, &'static str, &'static str>,
}

impl<'txn> PoolTables<'txn> {
    fn open(txn: &'txn WriteTransaction) -> Result<Self> {
        Ok(Self {
            data: txn.open_table(KEY_DATA)?,
            created: txn.open_table(CREATED_INDEX)?,
            secrets: txn.open_table(SECRET_INDEX)?,
            meta: txn.open_table(KEY_META)?,
        })
    }

    fn meta(&self, id: &str) -> Result<Option<(i64, String)>> {
        match self.meta.get(id)? {
            Some(value) => Ok(Some(decode_meta(value.value())?)),
            None => Ok(None),
        }
    }

    fn insert(&mut self, entry: &PoolEntry) -> Result<()> {
        if self.data.get(entry.id.as_str())?.is_some() {
            return Err(anyhow!("Key record {} already exists", entry.id));
        }

        self.data.insert(entry.id.as_str(), entry.data.as_slice())?;
        let created_key = created_index_key(entry.created_at_ms, &entry.id);
        self.created
            .insert(created_key.as_str(), entry.id.as_str())?;
        let secret_key = secret_index_key(&entry.secret, &entry.id);
        self.secrets.insert(secret_key.as_str(), entry.id.as_str())?;
        let meta = encode_meta(entry.created_at_ms, &entry.secret);
        self.meta.insert(entry.id.as_str(), meta.as_str())?;
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<bool> {
        if let Some((created_at_ms, secret)) = self.meta(id)? {
            self.created
                .remove(created_index_key(created_at_ms, id).as_str())?;
            self.secrets
                .remove(secret_index_key(&secret, id).as_str())?;
            self.meta.remove(id)?;
        }
        Ok(self.data.remove(id)?.is_some())
    }
}

impl ApiKeyPoolStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(KEY_DATA)?;
        write_txn.open_table(CREATED_INDEX)?;
        write_txn.open_table(SECRET_INDEX)?;
        write_txn.open_table(KEY_META)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert all entries in one transaction. Either every entry is written or none is.
    pub fn insert_batch(&self, entries: &[PoolEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin_write()?;
        {
            let mut tables = PoolTables::open(&txn)?;
            for entry in entries {
                tables.insert(entry)?;
            }
        }
        txn.commit()?;

        tracing::debug!(count = entries.len(), "Inserted key records");
        Ok(entries.len())
    }

    /// Insert a single entry.
    pub fn insert(&self, entry: &PoolEntry) -> Result<()> {
        self.insert_batch(std::slice::from_ref(entry)).map(|_| ())
    }

    /// Replace the stored bytes of an existing record, keeping its creation time.
    ///
    /// Returns false when no record has this id.
    pub fn update_raw(&self, id: &str, secret: &str, data: &[u8]) -> Result<bool> {
        let txn = self.db.begin_write()?;
        {
            let mut tables = PoolTables::open(&txn)?;
            let Some((created_at_ms, old_secret)) = tables.meta(id)? else {
                return Ok(false);
            };

            if old_secret != secret {
                tables
                    .secrets
                    .remove(secret_index_key(&old_secret, id).as_str())?;
                tables
                    .secrets
                    .insert(secret_index_key(secret, id).as_str(), id)?;
                let meta = encode_meta(created_at_ms, secret);
                tables.meta.insert(id, meta.as_str())?;
            }

            tables.data.insert(id, data)?;
        }
        txn.commit()?;
        Ok(true)
    }

    /// Get raw bytes by ID.
    pub fn get_raw(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KEY_DATA)?;

        if let Some(value) = table.get(id)? {
            Ok(Some(value.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Delete by ID, returns true if existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut tables = PoolTables::open(&txn)?;
            tables.remove(id)?
        };
        txn.commit()?;
        Ok(existed)
    }

    /// Count all records.
    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KEY_DATA)?;
        Ok(table.len()? as usize)
    }

    /// Visit records newest first until the visitor breaks.
    pub fn for_each_newest_first<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&str, &[u8]) -> Result<ControlFlow<()>>,
    {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CREATED_INDEX)?;
        let data = read_txn.open_table(KEY_DATA)?;

        for item in index.iter()? {
            let (_, id) = item?;
            let id = id.value();
            let Some(bytes) = data.get(id)? else {
                tracing::warn!(id, "Ordering index points at a missing key record");
                continue;
            };
            if visit(id, bytes.value())?.is_break() {
                break;
            }
        }

        Ok(())
    }

    /// List all records newest first as (id, data) pairs.
    pub fn list_raw(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut items = Vec::new();
        self.for_each_newest_first(|id, bytes| {
            items.push((id.to_string(), bytes.to_vec()));
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(items)
    }

    /// Fetch every record whose raw key is one of `secrets`.
    pub fn find_by_secrets<S: AsRef<str>>(&self, secrets: &[S]) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(SECRET_INDEX)?;
        let data = read_txn.open_table(KEY_DATA)?;

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for secret in secrets {
            let secret = secret.as_ref();
            if !seen.insert(secret) {
                continue;
            }

            let (start, end) = prefix_range(&secret_prefix(secret));
            for item in index.range(start.as_str()..end.as_str())? {
                let (_, id) = item?;
                let id = id.value();
                if let Some(bytes) = data.get(id)? {
                    items.push((id.to_string(), bytes.value().to_vec()));
                }
            }
        }

        Ok(items)
    }
}

fn encode_meta(created_at_ms: i64, secret: &str) -> String {
    format!("{created_at_ms}:{secret}")
}

fn decode_meta(value: &str) -> Result<(i64, String)> {
    let (created, secret) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("Malformed key record metadata"))?;
    Ok((created.parse()?, secret.to_string()))
}
