//! Retrieval and source ranking.
//!
//! A [`Retriever`] embeds a query with the same [`EmbeddingPort`] used at
//! ingestion, asks the [`VectorStore`] for the nearest passages and assembles a
//! [`RetrievalResult`]: a template answer over the top passages plus up to three
//! sources deduplicated by document title.
//!
//! Each call is stateless apart from the store contents. An empty collection
//! is a normal outcome with an explanatory answer, not an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use embed::{embed_batch, EmbeddingPort};
use serde::{Deserialize, Serialize};
use store::{StoreError, VectorStore};
use tracing::{info, info_span, warn, Instrument};

mod compose;
mod config;
mod error;

pub use crate::compose::{
    build_context, compose_answer, dedup_sources, empty_answer, SourceEntry, CONTEXT_PASSAGES,
    MAX_SOURCES,
};
pub use crate::config::RetrievalConfig;
pub use crate::error::RetrieveError;

/// Answer payload for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,
    pub answer: String,
    /// At most [`MAX_SOURCES`], in ranked first-seen order.
    pub sources: Vec<SourceEntry>,
    /// Passages returned by the store, before dedup.
    pub retrieved_chunk_count: usize,
}

/// Observer for retrieval outcomes.
pub trait RetrievalMetrics: Send + Sync {
    /// `hit_count` is the number of passages the store returned and
    /// `source_count` the number of sources after dedup.
    fn record_retrieval(&self, latency: Duration, hit_count: usize, source_count: usize);
}

pub struct Retriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingPort>,
    cfg: RetrievalConfig,
    metrics: Option<Arc<dyn RetrievalMetrics>>,
}

impl Retriever {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingPort>,
        cfg: RetrievalConfig,
    ) -> Result<Self, RetrieveError> {
        cfg.validate()?;
        Ok(Self {
            store,
            embedder,
            cfg,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn RetrievalMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.cfg
    }

    /// [`retrieve`](Self::retrieve) with the configured default `n_results`.
    pub async fn retrieve_default(&self, query: &str) -> Result<RetrievalResult, RetrieveError> {
        self.retrieve(query, self.cfg.default_n_results).await
    }

    /// Embed `query`, fetch up to `n_results` passages and assemble the result.
    pub async fn retrieve(
        &self,
        query: &str,
        n_results: usize,
    ) -> Result<RetrievalResult, RetrieveError> {
        let start = Instant::now();
        let span = info_span!(
            "retrieve.retrieve",
            n_results,
            query_len = query.len(),
            collection = %self.store.config().collection
        );

        match self
            .retrieve_inner(query, n_results)
            .instrument(span)
            .await
        {
            Ok(result) => {
                let latency = start.elapsed();
                if let Some(metrics) = &self.metrics {
                    metrics.record_retrieval(
                        latency,
                        result.retrieved_chunk_count,
                        result.sources.len(),
                    );
                }
                info!(
                    n_results,
                    retrieved_chunks = result.retrieved_chunk_count,
                    sources = result.sources.len(),
                    elapsed_micros = latency.as_micros() as u64,
                    "retrieve_success"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(
                    n_results,
                    error = %err,
                    elapsed_micros = start.elapsed().as_micros() as u64,
                    "retrieve_failure"
                );
                Err(err)
            }
        }
    }

    async fn retrieve_inner(
        &self,
        query: &str,
        n_results: usize,
    ) -> Result<RetrievalResult, RetrieveError> {
        if query.trim().is_empty() {
            return Err(RetrieveError::InvalidRequest(
                "query must not be blank".into(),
            ));
        }
        if n_results == 0 {
            return Err(RetrieveError::InvalidRequest(
                "n_results must be greater than zero".into(),
            ));
        }

        let texts = [query.to_string()];
        let mut vectors = embed_batch(self.embedder.as_ref(), &texts, self.cfg.embed_timeout())
            .await?;
        let embedding = vectors.pop().ok_or_else(|| {
            RetrieveError::Embedding(embed::EmbedError::BatchShape {
                expected: 1,
                got: 0,
            })
        })?;

        let store = Arc::clone(&self.store);
        let hits = tokio::task::spawn_blocking(move || store.query(&embedding, n_results))
            .await
            .map_err(StoreError::backend)??;

        if hits.is_empty() {
            return Ok(RetrievalResult {
                query: query.to_string(),
                answer: empty_answer(query),
                sources: Vec::new(),
                retrieved_chunk_count: 0,
            });
        }

        let context = build_context(&hits, self.cfg.context_char_budget);
        Ok(RetrievalResult {
            query: query.to_string(),
            answer: compose_answer(query, &context),
            sources: dedup_sources(&hits),
            retrieved_chunk_count: hits.len(),
        })
    }
}
