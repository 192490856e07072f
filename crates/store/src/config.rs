use serde::{Deserialize, Serialize};
use zstd::{decode_all, encode_all};

use crate::{AnnConfig, BackendConfig, DistanceMetric, StoreError};

/// Collection name used when none is configured.
pub const DEFAULT_COLLECTION: &str = "wikipedia_articles";

/// Compression codec options for record storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

impl std::fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CompressionCodec::None => "none",
            CompressionCodec::Zstd => "zstd",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Zstd level, 1-22.
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub(crate) fn compress(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    pub(crate) fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Configuration for opening a collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Collection namespace.
    pub collection: String,
    pub backend: BackendConfig,
    /// Used when the collection is created; must match on reopen.
    pub metric: DistanceMetric,
    pub compression: CompressionConfig,
    pub ann: AnnConfig,
    /// Records per backend write transaction.
    pub write_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            backend: BackendConfig::default(),
            metric: DistanceMetric::default(),
            compression: CompressionConfig::default(),
            ann: AnnConfig::default(),
            write_batch_size: 100,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_ann(mut self, ann: AnnConfig) -> Self {
        self.ann = ann;
        self
    }

    pub fn with_write_batch_size(mut self, size: usize) -> Self {
        self.write_batch_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.collection.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "collection name must not be empty".into(),
            ));
        }
        if self.write_batch_size == 0 {
            return Err(StoreError::InvalidConfig(
                "write_batch_size must be greater than zero".into(),
            ));
        }
        if self.compression.codec == CompressionCodec::Zstd
            && !(1..=22).contains(&self.compression.level)
        {
            return Err(StoreError::InvalidConfig(format!(
                "zstd level must be within 1..=22, got {}",
                self.compression.level
            )));
        }
        self.ann.validate().map_err(StoreError::InvalidConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.collection, "wikipedia_articles");
        assert_eq!(cfg.metric, DistanceMetric::Cosine);
        assert_eq!(cfg.write_batch_size, 100);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(StoreConfig::new().with_collection("  ").validate().is_err());
        assert!(StoreConfig::new().with_write_batch_size(0).validate().is_err());
        let cfg = StoreConfig::new().with_compression(CompressionConfig::default().with_level(40));
        assert!(matches!(cfg.validate(), Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn uncompressed_ignores_level() {
        let cfg = StoreConfig::new()
            .with_compression(CompressionConfig::new(CompressionCodec::None, 0));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn compression_roundtrip() {
        let data = b"the quick brown fox ".repeat(20);
        let zstd = CompressionConfig::default();
        let packed = zstd.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(zstd.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: StoreConfig =
            serde_json::from_str(r#"{"collection":"c","metric":"l2"}"#).unwrap();
        assert_eq!(cfg.collection, "c");
        assert_eq!(cfg.metric, DistanceMetric::L2);
        assert_eq!(cfg.write_batch_size, 100);
        assert_eq!(cfg.backend, BackendConfig::InMemory);
    }
}
