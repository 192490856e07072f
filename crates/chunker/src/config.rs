//! Configuration for the chunker.
//!
//! # Examples
//!
//! ```rust
//! use chunker::ChunkConfig;
//!
//! let config = ChunkConfig::default();
//! assert_eq!(config.chunk_size, 500);
//! assert_eq!(config.overlap, 50);
//! assert_eq!(config.stride().unwrap(), 450);
//! ```
//!
//! ```rust
//! use chunker::{ChunkConfig, ChunkError};
//!
//! let config = ChunkConfig::new(10, 10);
//! assert!(matches!(config.validate(), Err(ChunkError::InvalidConfig(_))));
//! ```

use serde::{Deserialize, Serialize};

use crate::ChunkError;

/// Window parameters, measured in whitespace tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum number of tokens per chunk.
    #[serde(default = "ChunkConfig::default_chunk_size")]
    pub chunk_size: usize,
    /// Number of tokens shared by adjacent chunks. Must be smaller than `chunk_size`.
    #[serde(default = "ChunkConfig::default_overlap")]
    pub overlap: usize,
}

impl ChunkConfig {
    pub(crate) fn default_chunk_size() -> usize {
        500
    }

    pub(crate) fn default_overlap() -> usize {
        50
    }

    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Checks `chunk_size > overlap`; `overlap >= 0` holds by type.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance the window start advances between chunks.
    pub fn stride(&self) -> Result<usize, ChunkError> {
        self.validate()?;
        Ok(self.chunk_size - self.overlap)
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: Self::default_chunk_size(),
            overlap: Self::default_overlap(),
        }
    }
}
