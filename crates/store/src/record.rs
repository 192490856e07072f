use serde::{Deserialize, Serialize};

use crate::{CompressionCodec, DistanceMetric, StoreError};

/// Bump this value whenever the on-disk record or collection-info layout changes.
pub const STORE_SCHEMA_VERSION: u16 = 2;

/// Fixed-field metadata carried by every stored passage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PassageMetadata {
    pub title: String,
    pub url: String,
    pub topic: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// One passage with its embedding, as owned by the store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredRecord {
    /// Unique within the collection. Re-adding an id overwrites the record.
    pub id: String,
    pub embedding: Vec<f32>,
    /// Passage text.
    pub text: String,
    pub metadata: PassageMetadata,
}

impl StoredRecord {
    /// Checks the fields the store relies on. Dimension agreement with the
    /// collection is checked separately by the store.
    pub fn validate(&self) -> Result<(), StoreError> {
        let invalid = |reason: &str| StoreError::InvalidRecord {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.metadata.title.trim().is_empty() {
            return Err(invalid("title must not be empty"));
        }
        if self.metadata.total_chunks == 0 {
            return Err(invalid("total_chunks must be at least 1"));
        }
        if self.metadata.chunk_index >= self.metadata.total_chunks {
            return Err(invalid("chunk_index must be below total_chunks"));
        }
        if self.embedding.is_empty() {
            return Err(invalid("embedding must not be empty"));
        }
        if self.embedding.iter().any(|v| !v.is_finite()) {
            return Err(invalid("embedding contains non-finite values"));
        }
        Ok(())
    }
}

/// A query match, in ascending distance order within a result list.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub text: String,
    pub metadata: PassageMetadata,
    pub distance: f32,
}

/// Persisted description of a collection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub metric: DistanceMetric,
    /// Set by the first successful add; `None` while the collection is empty.
    pub dimension: Option<usize>,
    pub schema_version: u16,
    /// Codec every record of the collection is written with.
    pub codec: CompressionCodec,
}

impl CollectionInfo {
    pub fn new(name: impl Into<String>, metric: DistanceMetric, codec: CompressionCodec) -> Self {
        Self {
            name: name.into(),
            metric,
            dimension: None,
            schema_version: STORE_SCHEMA_VERSION,
            codec,
        }
    }
}
