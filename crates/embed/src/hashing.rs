use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedError, EmbeddingPort};

/// Default dimension, matching small sentence-transformer models.
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Deterministic feature-hashing embedder.
///
/// Each lowercased alphanumeric token is hashed into one of `dimension`
/// buckets with a sign taken from the hash, and the result is L2-normalized.
/// Texts sharing vocabulary land close together under cosine distance, which
/// is enough for tests, demos and offline runs without a model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbedError> {
        if dimension == 0 {
            return Err(EmbedError::InvalidConfig(
                "hashing dimension must be greater than zero".into(),
            ));
        }
        Ok(Self {
            dimension,
            model_name: format!("feature-hashing-{dimension}"),
        })
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embeds a single text. Text without alphanumeric tokens maps to the zero vector.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = hash64(token.to_lowercase().as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
            v[bucket] += sign;
        }
        l2_normalize_in_place(&mut v);
        v
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_HASHING_DIMENSION,
            model_name: format!("feature-hashing-{DEFAULT_HASHING_DIMENSION}"),
        }
    }
}

#[async_trait]
impl EmbeddingPort for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
