//! Redb backend for persistent collections.
//!
//! A single database file can hold several collections. Each collection gets
//! its own records table (`records::<collection>`); collection info for all of
//! them lives in one shared `collection_info` table keyed by collection name.
//!
//! # Configuration Example
//! ```yaml
//! collection:
//!   name: "wikipedia_articles"
//!   backend:
//!     kind: "redb"
//!     path: "/data/wikirag.redb"
//! ```

use crate::{StoreBackend, StoreError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const INFO_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("collection_info");

/// Redb-backed storage for one collection.
///
/// Every write batch is one write transaction; readers see either all of a
/// batch or none of it.
pub struct RedbBackend {
    db: Arc<Database>,
    collection: String,
    records_table: String,
}

impl RedbBackend {
    /// Open or create the database at `path` and the tables for `collection`.
    ///
    /// # Example
    /// ```no_run
    /// use store::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/wikirag.redb", "wikipedia_articles").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, collection: &str) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::backend)?;
        Self::with_database(Arc::new(db), collection)
    }

    /// Use an already open database, e.g. to host several collections in one file.
    pub fn with_database(db: Arc<Database>, collection: &str) -> Result<Self, StoreError> {
        let backend = Self {
            db,
            collection: collection.to_string(),
            records_table: format!("records::{collection}"),
        };

        // Opening a table in a write transaction creates it.
        let write_txn = backend.db.begin_write().map_err(StoreError::backend)?;
        {
            write_txn
                .open_table(INFO_TABLE)
                .map_err(StoreError::backend)?;
            write_txn
                .open_table(backend.records())
                .map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;

        Ok(backend)
    }

    fn records(&self) -> TableDefinition<'_, &'static str, &'static [u8]> {
        TableDefinition::new(&self.records_table)
    }
}

impl StoreBackend for RedbBackend {
    fn write_batch(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        info: Option<Vec<u8>>,
    ) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(self.records())
                .map_err(StoreError::backend)?;
            for (key, value) in &entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(StoreError::backend)?;
            }
        }
        if let Some(info) = info {
            let mut table = write_txn
                .open_table(INFO_TABLE)
                .map_err(StoreError::backend)?;
            table
                .insert(self.collection.as_str(), info.as_slice())
                .map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(self.records())
            .map_err(StoreError::backend)?;

        let value = table.get(key).map_err(StoreError::backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(self.records())
            .map_err(StoreError::backend)?;

        for item in table.iter().map_err(StoreError::backend)? {
            let (key, value) = item.map_err(StoreError::backend)?;
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }

    fn clear(&self, info: Vec<u8>) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        write_txn
            .delete_table(self.records())
            .map_err(StoreError::backend)?;
        {
            write_txn
                .open_table(self.records())
                .map_err(StoreError::backend)?;
            let mut table = write_txn
                .open_table(INFO_TABLE)
                .map_err(StoreError::backend)?;
            table
                .insert(self.collection.as_str(), info.as_slice())
                .map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn load_info(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(INFO_TABLE)
            .map_err(StoreError::backend)?;
        let value = table
            .get(self.collection.as_str())
            .map_err(StoreError::backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn flush(&self) -> Result<(), StoreError> {
        // Commits are durable on return.
        Ok(())
    }
}
