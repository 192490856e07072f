//! Embedding port for passage and query text.
//!
//! The rest of the workspace only sees [`EmbeddingPort`]: a batch of texts in,
//! one fixed-dimension vector per text out. [`embed_batch`] wraps a port call
//! with a deadline and enforces that contract so callers can trust the shape
//! of what comes back.
//!
//! Implementations shipped here:
//!
//! - [`HashingEmbedder`]: deterministic, offline feature hashing
//! - `HttpEmbedder` (feature `http`): remote inference over JSON
//!
//! ```
//! use embed::{embed_batch, HashingEmbedder};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
//! let embedder = HashingEmbedder::new(16).unwrap();
//! let texts = vec!["hello world".to_string(), "goodbye".to_string()];
//! let vectors = rt.block_on(embed_batch(&embedder, &texts, None)).unwrap();
//! assert_eq!(vectors.len(), 2);
//! assert!(vectors.iter().all(|v| v.len() == 16));
//! ```

use std::time::Duration;

use async_trait::async_trait;

mod error;
mod hashing;
#[cfg(feature = "http")]
mod http;
mod normalize;

pub use crate::error::EmbedError;
pub use crate::hashing::{HashingEmbedder, DEFAULT_HASHING_DIMENSION};
#[cfg(feature = "http")]
pub use crate::http::{ApiProvider, HttpEmbedder, HttpEmbedderConfig};
pub use crate::normalize::l2_normalize_in_place;

/// Maps text to fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// all with the same length. The same port must embed passages and queries.
#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Label for logs.
    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Call `port` on `texts`, bounded by `timeout`, and check the result shape.
pub async fn embed_batch(
    port: &dyn EmbeddingPort,
    texts: &[String],
    timeout: Option<Duration>,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = match timeout {
        Some(limit) => tokio::time::timeout(limit, port.embed(texts))
            .await
            .map_err(|_| EmbedError::Timeout {
                after_ms: limit.as_millis() as u64,
            })??,
        None => port.embed(texts).await?,
    };

    validate_batch(texts.len(), &vectors)?;
    Ok(vectors)
}

/// One vector per input, all of one non-zero length.
pub fn validate_batch(expected: usize, vectors: &[Vec<f32>]) -> Result<(), EmbedError> {
    if vectors.len() != expected {
        return Err(EmbedError::BatchShape {
            expected,
            got: vectors.len(),
        });
    }
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let dim = first.len();
    if dim == 0 {
        return Err(EmbedError::Backend("port returned an empty vector".into()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(EmbedError::InconsistentDimension {
            expected: dim,
            got: bad.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShortPort;

    #[async_trait]
    impl EmbeddingPort for ShortPort {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(vec![vec![1.0; 4]; texts.len().saturating_sub(1)])
        }
    }

    struct RaggedPort;

    #[async_trait]
    impl EmbeddingPort for RaggedPort {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| vec![0.5; 3 + i])
                .collect())
        }
    }

    struct SlowPort;

    #[async_trait]
    impl EmbeddingPort for SlowPort {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![vec![0.0; 2]; texts.len()])
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[tokio::test]
    async fn count_mismatch_is_reported() {
        let err = embed_batch(&ShortPort, &texts(3), None).await.unwrap_err();
        assert_eq!(
            err,
            EmbedError::BatchShape {
                expected: 3,
                got: 2
            }
        );
    }

    #[tokio::test]
    async fn mixed_dimensions_are_reported() {
        let err = embed_batch(&RaggedPort, &texts(2), None).await.unwrap_err();
        assert_eq!(
            err,
            EmbedError::InconsistentDimension {
                expected: 3,
                got: 4
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_port_times_out() {
        let err = embed_batch(&SlowPort, &texts(1), Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert_eq!(err, EmbedError::Timeout { after_ms: 50 });
    }

    #[tokio::test]
    async fn empty_input_skips_the_port() {
        let out = embed_batch(&ShortPort, &[], None).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn hashing_embedder_passes_validation() {
        let embedder = HashingEmbedder::default();
        let out = embed_batch(&embedder, &texts(4), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| v.len() == DEFAULT_HASHING_DIMENSION));
    }
}
