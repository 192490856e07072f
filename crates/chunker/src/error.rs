use thiserror::Error;

/// Errors that can occur while chunking text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// `chunk_size > overlap >= 0` does not hold, so the window would never advance.
    #[error("invalid chunk configuration: {0}")]
    InvalidConfig(String),
}
