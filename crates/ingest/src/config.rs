//! Configuration for the ingestion pipeline.
//!
//! ```rust
//! use ingest::IngestConfig;
//! use std::time::Duration;
//!
//! let cfg = IngestConfig::default()
//!     .with_batch_size(32)
//!     .with_embed_timeout(Duration::from_secs(10));
//! assert!(cfg.validate().is_ok());
//! assert_eq!(cfg.chunking.chunk_size, 500);
//! ```

use std::time::Duration;

use chunker::ChunkConfig;
use serde::{Deserialize, Serialize};

use crate::IngestError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    pub chunking: ChunkConfig,
    /// Passages per embedding call and per store write.
    pub batch_size: usize,
    /// Deadline for each embedding call, in milliseconds. `None` waits indefinitely.
    pub embed_timeout_ms: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkConfig::default(),
            batch_size: 100,
            embed_timeout_ms: None,
        }
    }
}

impl IngestConfig {
    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn embed_timeout(&self) -> Option<Duration> {
        self.embed_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        self.chunking.validate()?;
        if self.batch_size == 0 {
            return Err(IngestError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }
        if self.embed_timeout_ms == Some(0) {
            return Err(IngestError::InvalidConfig(
                "embed_timeout_ms must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}
