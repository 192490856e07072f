//! YAML configuration for a retrieval system.
//!
//! One file describes the collection, chunking, ingestion, retrieval and the
//! embedder. Every section is optional and falls back to its defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "wikipedia-demo"
//!
//! collection:
//!   name: "wikipedia_articles"
//!   metric: "cosine"
//!   backend:
//!     kind: "redb"
//!     path: "./data/wikirag.redb"
//!   compression:
//!     codec: "zstd"
//!     level: 3
//!   ann:
//!     min_vectors_for_ann: 1000
//!   write_batch_size: 100
//!
//! chunking:
//!   chunk_size: 500
//!   overlap: 50
//!
//! ingest:
//!   batch_size: 100
//!   embed_timeout_ms: 30000
//!
//! retrieval:
//!   default_n_results: 5
//!   context_char_budget: 1500
//!
//! embedding:
//!   provider: "hashing"
//!   dimension: 384
//! ```

use std::fs;
use std::path::Path;

use chunker::ChunkConfig;
use ingest::IngestConfig;
use retrieve::RetrievalConfig;
use serde::{Deserialize, Serialize};
use store::{AnnConfig, BackendConfig, CompressionConfig, DistanceMetric, StoreConfig};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Configuration format version.
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub collection: CollectionYamlConfig,

    /// Shared by ingestion; overrides nothing else.
    #[serde(default)]
    pub chunking: ChunkConfig,

    #[serde(default)]
    pub ingest: IngestYamlConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub embedding: EmbeddingYamlConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            collection: CollectionYamlConfig::default(),
            chunking: ChunkConfig::default(),
            ingest: IngestYamlConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingYamlConfig::default(),
        }
    }
}

impl RagConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: RagConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.to_store_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("collection: {e}")))?;
        self.to_ingest_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("ingest: {e}")))?;
        self.retrieval
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("retrieval: {e}")))?;
        self.embedding.validate()?;
        Ok(())
    }

    pub fn to_store_config(&self) -> StoreConfig {
        let c = &self.collection;
        StoreConfig::new()
            .with_collection(c.name.clone())
            .with_backend(c.backend.clone())
            .with_metric(c.metric)
            .with_compression(c.compression.clone())
            .with_ann(c.ann)
            .with_write_batch_size(c.write_batch_size)
    }

    pub fn to_ingest_config(&self) -> IngestConfig {
        IngestConfig {
            chunking: self.chunking,
            batch_size: self.ingest.batch_size,
            embed_timeout_ms: self.ingest.embed_timeout_ms,
        }
    }

    pub fn to_retrieval_config(&self) -> RetrievalConfig {
        self.retrieval
    }
}

/// `collection` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionYamlConfig {
    pub name: String,
    pub metric: DistanceMetric,
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
    pub ann: AnnConfig,
    pub write_batch_size: usize,
}

impl Default for CollectionYamlConfig {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            name: store.collection,
            metric: store.metric,
            backend: store.backend,
            compression: store.compression,
            ann: store.ann,
            write_batch_size: store.write_batch_size,
        }
    }
}

/// `ingest` section; chunking lives in its own top-level section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestYamlConfig {
    pub batch_size: usize,
    pub embed_timeout_ms: Option<u64>,
}

impl Default for IngestYamlConfig {
    fn default() -> Self {
        let cfg = IngestConfig::default();
        Self {
            batch_size: cfg.batch_size,
            embed_timeout_ms: cfg.embed_timeout_ms,
        }
    }
}

/// Which embedder the host should build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    #[default]
    Hashing,
    /// Remote endpoint; needs the `http` feature and `url`.
    Http,
}

/// `embedding` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingYamlConfig {
    pub provider: EmbeddingProvider,
    /// Hashing embedder dimension.
    pub dimension: usize,
    pub url: Option<String>,
    /// Remote payload dialect: `huggingface`, `openai` or `custom`.
    pub api: Option<String>,
    pub model_name: Option<String>,
    /// Value of the `Authorization` header; `${VAR}` is read from the environment.
    pub auth_header: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingYamlConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            dimension: embed::DEFAULT_HASHING_DIMENSION,
            url: None,
            api: None,
            model_name: None,
            auth_header: None,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.provider {
            EmbeddingProvider::Hashing if self.dimension == 0 => Err(ConfigLoadError::Validation(
                "embedding.dimension must be greater than zero".into(),
            )),
            EmbeddingProvider::Http
                if self.url.as_deref().map_or(true, |u| u.trim().is_empty()) =>
            {
                Err(ConfigLoadError::Validation(
                    "embedding.url is required for the http provider".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// `auth_header` with a leading `${VAR}` reference resolved from the environment.
    pub fn resolved_auth_header(&self) -> Option<String> {
        let raw = self.auth_header.as_deref()?;
        match raw.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            Some(var) => std::env::var(var).ok(),
            None => Some(raw.to_string()),
        }
    }
}
