use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// Key-value persistence for one collection.
///
/// Record keys are record ids. Collection info lives beside the records and is
/// written in the same unit of work as a record batch, so a reader never sees
/// records whose dimension is not yet recorded.
pub trait StoreBackend: Send + Sync {
    /// Write one batch of encoded records, optionally replacing the encoded
    /// collection info, as a single unit.
    fn write_batch(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        info: Option<Vec<u8>>,
    ) -> Result<(), StoreError>;
    /// Retrieve an encoded record by id.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Visit every encoded record in key order.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
    /// Drop every record and replace the collection info.
    fn clear(&self, info: Vec<u8>) -> Result<(), StoreError>;
    fn load_info(&self) -> Result<Option<Vec<u8>>, StoreError>;
    /// Flush any buffered writes.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Selects and builds a backend.
///
/// # Example
/// ```
/// use store::BackendConfig;
///
/// // In-memory (for testing)
/// let config = BackendConfig::in_memory();
///
/// // Redb (pure Rust, persistent)
/// let config = BackendConfig::redb("/data/wikirag.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Redb database file at `path`. Requires the `backend-redb` feature
    /// (enabled by default).
    Redb { path: PathBuf },
    /// Process-local ordered map. Contents are lost on drop.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<PathBuf>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Build the backend for `collection`.
    pub fn build(&self, collection: &str) -> Result<Box<dyn StoreBackend>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path, collection)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = (path, collection);
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<String, Vec<u8>>,
    info: Option<Vec<u8>>,
}

/// In-memory backend: a `RwLock` around an ordered map.
#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<MemoryState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for InMemoryBackend {
    fn write_batch(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        info: Option<Vec<u8>>,
    ) -> Result<(), StoreError> {
        // One write lock for the whole batch.
        let mut guard = self
            .state
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        guard.records.extend(entries);
        if info.is_some() {
            guard.info = info;
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .state
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.records.get(key).cloned())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let guard = self
            .state
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        for (key, value) in guard.records.iter() {
            visitor(key, value)?;
        }
        Ok(())
    }

    fn clear(&self, info: Vec<u8>) -> Result<(), StoreError> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        guard.records.clear();
        guard.info = Some(info);
        Ok(())
    }

    fn load_info(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .state
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.info.clone())
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use redb::RedbBackend;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_batch_and_scan_order() {
        let backend = InMemoryBackend::new();
        backend
            .write_batch(
                vec![
                    ("b".to_string(), b"2".to_vec()),
                    ("a".to_string(), b"1".to_vec()),
                ],
                Some(b"info".to_vec()),
            )
            .unwrap();

        let mut keys = Vec::new();
        backend
            .scan(&mut |key, _| {
                keys.push(key.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(backend.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(backend.load_info().unwrap(), Some(b"info".to_vec()));
    }

    #[test]
    fn batch_without_info_keeps_existing_info() {
        let backend = InMemoryBackend::new();
        backend.write_batch(Vec::new(), Some(b"v1".to_vec())).unwrap();
        backend
            .write_batch(vec![("k".into(), b"x".to_vec())], None)
            .unwrap();
        assert_eq!(backend.load_info().unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn clear_drops_records() {
        let backend = InMemoryBackend::new();
        backend
            .write_batch(vec![("k".into(), b"x".to_vec())], None)
            .unwrap();
        backend.clear(b"fresh".to_vec()).unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
        assert_eq!(backend.load_info().unwrap(), Some(b"fresh".to_vec()));
    }

    #[test]
    fn backend_config_serde_shape() {
        let cfg = BackendConfig::redb("/tmp/x.redb");
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["kind"], "redb");
        assert_eq!(json["path"], "/tmp/x.redb");

        let back: BackendConfig = serde_json::from_str(r#"{"kind":"in_memory"}"#).unwrap();
        assert_eq!(back, BackendConfig::InMemory);
    }
}
