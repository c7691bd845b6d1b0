//! Storage layer with typed wrappers around keypool-storage.

pub mod key_pool;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use key_pool::KeyPoolStorage;

/// Typed stores sharing one database handle.
pub struct Storage {
    pub keys: KeyPoolStorage,
}

impl Storage {
    /// Open or create the database at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        let keys = KeyPoolStorage::new(db)?;

        Ok(Self { keys })
    }
}
