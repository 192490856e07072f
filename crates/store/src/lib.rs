//! # Wikirag Store
//!
//! A persistent vector store for chunked passages. Each [`VectorStore`] owns one
//! named collection: a set of [`StoredRecord`]s (id, embedding, passage text and
//! fixed-field metadata) plus a [`CollectionInfo`] that pins the distance metric
//! and, after the first insert, the embedding dimension.
//!
//! ## Core Features
//!
//! - **Pluggable Backends** behind [`StoreBackend`]: an ordered in-memory map and
//!   a Redb file (feature `backend-redb`, on by default).
//! - **Compact Storage**: records are encoded with `bincode` and optionally
//!   compressed with Zstd before they reach the backend.
//! - **Similarity Search**: exact scan for small collections, HNSW for large
//!   cosine collections, always returned in non-decreasing distance order.
//! - **Batch Atomicity**: an `add` call is applied under one write lock, and each
//!   backend batch commits as one transaction. Concurrent queries see either all
//!   of an `add` or none of it.
//!
//! ## Example Usage
//!
//! ```
//! use store::{PassageMetadata, StoreConfig, StoredRecord, VectorStore};
//!
//! let store = VectorStore::open(StoreConfig::default()).unwrap();
//!
//! let record = StoredRecord {
//!     id: "0_0".to_string(),
//!     embedding: vec![1.0, 0.0, 0.0],
//!     text: "Rust is a systems programming language.".to_string(),
//!     metadata: PassageMetadata {
//!         title: "Rust (programming language)".to_string(),
//!         url: "https://en.wikipedia.org/wiki/Rust_(programming_language)".to_string(),
//!         topic: "programming".to_string(),
//!         chunk_index: 0,
//!         total_chunks: 1,
//!     },
//! };
//! store.add(&[record]).unwrap();
//!
//! let hits = store.query(&[1.0, 0.0, 0.0], 5).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].id, "0_0");
//! assert!(hits[0].distance.abs() < 1e-6);
//! ```

pub mod ann;
mod backend;
mod config;
mod distance;
mod record;

use std::sync::RwLock;
use std::time::Instant;

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use thiserror::Error;
use tracing::{debug, info};

pub use crate::ann::{AnnConfig, AnnIndex, AnnResult};
#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, StoreBackend};
pub use config::{CompressionCodec, CompressionConfig, StoreConfig, DEFAULT_COLLECTION};
pub use distance::{cosine_distance, squared_l2, DistanceMetric};
pub use record::{
    CollectionInfo, PassageMetadata, QueryHit, StoredRecord, STORE_SCHEMA_VERSION,
};

/// Errors raised by the store and its backends.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Compression(String),
    /// Embedding length differs from the collection's dimension.
    #[error("Dimension mismatch: collection expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// The collection was created with another metric.
    #[error("Metric mismatch: collection uses {stored}, config requests {requested}")]
    MetricMismatch {
        stored: DistanceMetric,
        requested: DistanceMetric,
    },
    /// The collection's records were written with another codec.
    #[error("Compression mismatch: collection uses {stored}, config requests {requested}")]
    CompressionMismatch {
        stored: CompressionCodec,
        requested: CompressionCodec,
    },
    #[error("Invalid record {id:?}: {reason}")]
    InvalidRecord { id: String, reason: String },
    #[error("Invalid store config: {0}")]
    InvalidConfig(String),
}

impl From<EncodeError> for StoreError {
    fn from(e: EncodeError) -> Self {
        StoreError::Encode(e.to_string())
    }
}

impl From<DecodeError> for StoreError {
    fn from(e: DecodeError) -> Self {
        StoreError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Compression(e.to_string())
    }
}

impl From<ann::AnnError> for StoreError {
    fn from(e: ann::AnnError) -> Self {
        match e {
            ann::AnnError::DimensionMismatch { expected, got } => {
                StoreError::DimensionMismatch { expected, got }
            }
        }
    }
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

struct CollectionState {
    info: CollectionInfo,
    /// `None` until the collection has a dimension.
    ann: Option<AnnIndex>,
}

impl CollectionState {
    fn len(&self) -> usize {
        self.ann.as_ref().map_or(0, AnnIndex::len)
    }
}

/// One named collection of passage vectors.
pub struct VectorStore {
    backend: Box<dyn StoreBackend>,
    cfg: StoreConfig,
    state: RwLock<CollectionState>,
}

impl VectorStore {
    /// Open or create the configured collection, building the backend from config.
    pub fn open(cfg: StoreConfig) -> Result<Self, StoreError> {
        cfg.validate()?;
        let backend = cfg.backend.build(&cfg.collection)?;
        Self::with_backend(cfg, backend)
    }

    /// Open the collection on a caller-supplied backend.
    ///
    /// Existing records are loaded into the in-memory search index.
    pub fn with_backend(
        cfg: StoreConfig,
        backend: Box<dyn StoreBackend>,
    ) -> Result<Self, StoreError> {
        cfg.validate()?;
        let start = Instant::now();

        let info = match backend.load_info()? {
            Some(bytes) => {
                let info: CollectionInfo = decode_info(&bytes)?;
                if info.metric != cfg.metric {
                    return Err(StoreError::MetricMismatch {
                        stored: info.metric,
                        requested: cfg.metric,
                    });
                }
                if info.codec != cfg.compression.codec {
                    return Err(StoreError::CompressionMismatch {
                        stored: info.codec,
                        requested: cfg.compression.codec,
                    });
                }
                info
            }
            None => {
                let info =
                    CollectionInfo::new(cfg.collection.clone(), cfg.metric, cfg.compression.codec);
                backend.write_batch(Vec::new(), Some(encode_info(&info)?))?;
                info
            }
        };

        let mut ann = info
            .dimension
            .map(|dim| AnnIndex::new(dim, info.metric, cfg.ann));
        if let Some(index) = ann.as_mut() {
            backend.scan(&mut |_, data| {
                let record = decode_record(&cfg.compression, data)?;
                index.upsert(&record.id, record.embedding)?;
                Ok(())
            })?;
            index.build();
        }

        let state = CollectionState { info, ann };
        info!(
            collection = %cfg.collection,
            metric = %state.info.metric,
            dimension = ?state.info.dimension,
            records = state.len(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "store_open"
        );

        Ok(Self {
            backend,
            cfg,
            state: RwLock::new(state),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// Insert or overwrite records by id. Returns the number of records written.
    ///
    /// All records are validated before anything is written. Writes then go to
    /// the backend in `write_batch_size` chunks, one transaction each. If a chunk
    /// fails, earlier chunks stay committed and searchable.
    pub fn add(&self, records: &[StoredRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let start = Instant::now();

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;

        let dimension = state.info.dimension.unwrap_or(records[0].embedding.len());
        for record in records {
            record.validate()?;
            if record.embedding.len() != dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: dimension,
                    got: record.embedding.len(),
                });
            }
        }

        let mut written = 0;
        for batch in records.chunks(self.cfg.write_batch_size) {
            let entries = batch
                .iter()
                .map(|record| {
                    let encoded = encode_record(&self.cfg.compression, record)?;
                    Ok::<_, StoreError>((record.id.clone(), encoded))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let info_update = if state.info.dimension.is_none() {
                let mut info = state.info.clone();
                info.dimension = Some(dimension);
                Some(info)
            } else {
                None
            };
            let encoded_info = info_update.as_ref().map(encode_info).transpose()?;

            self.backend.write_batch(entries, encoded_info)?;

            if let Some(info) = info_update {
                state.info = info;
            }
            let (metric, ann_cfg) = (state.info.metric, self.cfg.ann);
            let index = state
                .ann
                .get_or_insert_with(|| AnnIndex::new(dimension, metric, ann_cfg));
            for record in batch {
                index.upsert(&record.id, record.embedding.clone())?;
            }
            written += batch.len();
        }

        if let Some(index) = state.ann.as_mut() {
            if !index.is_built() {
                index.build();
            }
        }

        info!(
            collection = %self.cfg.collection,
            added = written,
            total = state.len(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "store_add"
        );
        Ok(written)
    }

    /// Up to `k` nearest records to `embedding`, closest first.
    ///
    /// An empty collection yields no hits. A query whose length differs from
    /// the collection dimension is a [`StoreError::DimensionMismatch`].
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>, StoreError> {
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(StoreError::InvalidRecord {
                id: "<query>".into(),
                reason: "query embedding contains non-finite values".into(),
            });
        }

        let state = self
            .state
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;

        let Some(index) = state.ann.as_ref() else {
            return Ok(Vec::new());
        };
        let neighbours = index.search(embedding, k)?;

        // Records are fetched under the read lock so an overlapping add cannot
        // swap text out from under the ranked ids.
        let mut hits = Vec::with_capacity(neighbours.len());
        for neighbour in neighbours {
            let record = self.fetch(&neighbour.id)?.ok_or_else(|| {
                StoreError::backend(format!("record {} missing from backend", neighbour.id))
            })?;
            hits.push(QueryHit {
                id: record.id,
                text: record.text,
                metadata: record.metadata,
                distance: neighbour.distance,
            });
        }

        debug!(
            collection = %self.cfg.collection,
            k,
            hits = hits.len(),
            hnsw = index.uses_hnsw(),
            "store_query"
        );
        Ok(hits)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(state.len())
    }

    /// Visit every record id without touching the backend.
    pub fn scan_ids(&self, visitor: &mut dyn FnMut(&str)) -> Result<(), StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        if let Some(index) = state.ann.as_ref() {
            index.ids().for_each(|id| visitor(id));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        self.fetch(id)
    }

    pub fn info(&self) -> Result<CollectionInfo, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(state.info.clone())
    }

    /// Remove every record. The metric is kept; the dimension is reset so the
    /// next add may fix a new one.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;

        let mut info = state.info.clone();
        info.dimension = None;
        self.backend.clear(encode_info(&info)?)?;

        state.info = info;
        state.ann = None;
        info!(collection = %self.cfg.collection, "store_clear");
        Ok(())
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.backend.flush()
    }

    fn fetch(&self, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        match self.backend.get(id)? {
            Some(data) => Ok(Some(decode_record(&self.cfg.compression, &data)?)),
            None => Ok(None),
        }
    }
}

fn encode_record(
    compression: &CompressionConfig,
    record: &StoredRecord,
) -> Result<Vec<u8>, StoreError> {
    let encoded = encode_to_vec((STORE_SCHEMA_VERSION, record), standard())?;
    compression.compress(&encoded)
}

fn decode_record(compression: &CompressionConfig, data: &[u8]) -> Result<StoredRecord, StoreError> {
    let decompressed = compression.decompress(data)?;
    let ((version, record), _): ((u16, StoredRecord), usize) =
        decode_from_slice(&decompressed, standard())?;
    if version != STORE_SCHEMA_VERSION {
        return Err(StoreError::Decode(format!(
            "unsupported record schema version {version}"
        )));
    }
    Ok(record)
}

fn encode_info(info: &CollectionInfo) -> Result<Vec<u8>, StoreError> {
    Ok(encode_to_vec(info, standard())?)
}

fn decode_info(data: &[u8]) -> Result<CollectionInfo, StoreError> {
    let (info, _): (CollectionInfo, usize) = decode_from_slice(data, standard())?;
    if info.schema_version != STORE_SCHEMA_VERSION {
        return Err(StoreError::Decode(format!(
            "unsupported collection schema version {}",
            info.schema_version
        )));
    }
    Ok(info)
}
