//! Error types produced by the ingest crate.
//!
//! Failures that happen after some passages were already written carry the
//! failing batch number and the count of passages committed before it, so a
//! caller can report exactly how far an ingestion got.

use chunker::ChunkError;
use embed::EmbedError;
use store::StoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestError {
    /// Chunking parameters are unusable.
    #[error("invalid chunking config: {0}")]
    Chunking(#[from] ChunkError),
    #[error("invalid ingest config: {0}")]
    InvalidConfig(String),
    /// A document failed validation; nothing was written.
    #[error("document {index} is invalid: {reason}")]
    InvalidDocument { index: usize, reason: String },
    /// The embedding port failed on batch `batch` (0-based).
    #[error("embedding failed on batch {batch} ({committed} passages committed): {source}")]
    Embedding {
        batch: usize,
        committed: usize,
        source: EmbedError,
    },
    /// The vector store failed on batch `batch` (0-based).
    #[error("store write failed on batch {batch} ({committed} passages committed): {source}")]
    Store {
        batch: usize,
        committed: usize,
        source: StoreError,
    },
    /// Reading or writing a document file failed.
    #[error("document source error: {0}")]
    Source(String),
}

impl IngestError {
    /// Passages committed before the failure, if any were attempted.
    pub fn committed(&self) -> usize {
        match self {
            IngestError::Embedding { committed, .. } | IngestError::Store { committed, .. } => {
                *committed
            }
            _ => 0,
        }
    }

    /// Index of the failing batch, for batch-level failures.
    pub fn failed_batch(&self) -> Option<usize> {
        match self {
            IngestError::Embedding { batch, .. } | IngestError::Store { batch, .. } => Some(*batch),
            _ => None,
        }
    }
}
