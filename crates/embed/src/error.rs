use thiserror::Error;

/// Errors surfaced by an [`EmbeddingPort`](crate::EmbeddingPort).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbedError {
    /// The embedding backend failed (model error, remote error, bad response).
    #[error("embedding backend failure: {0}")]
    Backend(String),
    /// The call exceeded the caller-supplied timeout.
    #[error("embedding timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    /// The port returned a different number of vectors than it was given texts.
    #[error("embedding batch shape mismatch: {expected} inputs, {got} vectors")]
    BatchShape { expected: usize, got: usize },
    /// Vectors within one batch disagree on dimensionality, or are empty.
    #[error("inconsistent embedding dimension: expected {expected}, got {got}")]
    InconsistentDimension { expected: usize, got: usize },
    /// Embedder configuration is unusable.
    #[error("invalid embedder config: {0}")]
    InvalidConfig(String),
    /// Transport-level failure talking to a remote endpoint.
    #[error("http failure: {0}")]
    Http(String),
}
