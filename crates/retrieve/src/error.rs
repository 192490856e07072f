use embed::EmbedError;
use store::StoreError;
use thiserror::Error;

/// Failures of a single `retrieve` call. None of them are retried internally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetrieveError {
    /// The request itself is unusable (blank query, zero results requested).
    #[error("invalid retrieval request: {0}")]
    InvalidRequest(String),
    #[error("invalid retrieval config: {0}")]
    InvalidConfig(String),
    /// The query could not be embedded.
    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbedError),
    /// The vector store could not be queried.
    #[error("failed to query store: {0}")]
    Store(#[from] StoreError),
}
