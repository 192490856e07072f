//! Umbrella crate for the Wikirag retrieval core.
//!
//! [`RagSystem`] wires one [`VectorStore`] collection to an [`Ingestor`] and a
//! [`Retriever`] that share a single [`EmbeddingPort`]. It is the entry point a
//! hosting layer (HTTP service, CLI, batch job) calls:
//!
//! - [`RagSystem::ingest`] chunks, embeds and stores documents
//! - [`RagSystem::retrieve`] answers a query with ranked, deduplicated sources
//! - [`RagSystem::count`] reports the collection size
//!
//! Nothing here is a process-wide singleton; every handle is owned and passed
//! explicitly.
//!
//! ```
//! use std::sync::Arc;
//! use wikirag::{Document, HashingEmbedder, RagConfig, RagSystem};
//!
//! let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
//! rt.block_on(async {
//!     let embedder = Arc::new(HashingEmbedder::new(128).unwrap());
//!     let system = RagSystem::open(&RagConfig::default(), embedder).unwrap();
//!
//!     system
//!         .ingest(&[Document::new(
//!             "Rust (programming language)",
//!             "Rust is a general-purpose programming language emphasizing memory safety.",
//!             "https://en.wikipedia.org/wiki/Rust_(programming_language)",
//!             "programming",
//!         )])
//!         .await
//!         .unwrap();
//!
//!     let result = system.retrieve("memory safety", 5).await.unwrap();
//!     assert_eq!(result.retrieved_chunk_count, 1);
//!     assert_eq!(result.sources[0].title, "Rust (programming language)");
//! });
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

pub mod config;
pub mod logging;

pub use chunker::{chunk_spans, chunk_text, ChunkConfig, ChunkError, ChunkSpan};
#[cfg(feature = "http")]
pub use embed::{ApiProvider, HttpEmbedder, HttpEmbedderConfig};
pub use embed::{EmbedError, EmbeddingPort, HashingEmbedder};
pub use ingest::{
    Document, DocumentSource, IngestConfig, IngestError, IngestReport, Ingestor, JsonFileSource,
};
pub use retrieve::{
    RetrievalConfig, RetrievalMetrics, RetrievalResult, RetrieveError, Retriever, SourceEntry,
};
pub use store::{
    AnnConfig, BackendConfig, CollectionInfo, CompressionCodec, CompressionConfig, DistanceMetric,
    PassageMetadata, QueryHit, StoreConfig, StoreError, StoredRecord, VectorStore,
};

pub use crate::config::{ConfigLoadError, EmbeddingProvider, EmbeddingYamlConfig, RagConfig};

/// Errors surfaced by the [`RagSystem`] facade.
#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
}

/// A collection plus the pipelines that write to and read from it.
pub struct RagSystem {
    store: Arc<VectorStore>,
    ingestor: Ingestor,
    retriever: Retriever,
}

impl RagSystem {
    /// Validate `cfg`, open its collection and wire both pipelines to `embedder`.
    ///
    /// Ordinals continue after the records already in the collection, so a
    /// restarted process does not overwrite earlier ingestions.
    pub fn open(cfg: &RagConfig, embedder: Arc<dyn EmbeddingPort>) -> Result<Self, RagError> {
        cfg.validate()?;
        let store = Arc::new(VectorStore::open(cfg.to_store_config())?);
        let first_ordinal = next_free_ordinal(&store)?;
        let ingestor = Ingestor::new(Arc::clone(&store), Arc::clone(&embedder), cfg.to_ingest_config())?
            .with_first_ordinal(first_ordinal);
        let retriever = Retriever::new(Arc::clone(&store), embedder, cfg.to_retrieval_config())?;
        info!(
            name = cfg.name.as_deref().unwrap_or_default(),
            collection = %store.config().collection,
            first_ordinal,
            "rag_open"
        );
        Ok(Self {
            store,
            ingestor,
            retriever,
        })
    }

    /// Assemble a system from already built parts. The ingestor and retriever
    /// should share `store`.
    pub fn from_parts(store: Arc<VectorStore>, ingestor: Ingestor, retriever: Retriever) -> Self {
        Self {
            store,
            ingestor,
            retriever,
        }
    }

    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport, RagError> {
        Ok(self.ingestor.ingest(documents).await?)
    }

    /// Load every document from `source` and ingest it in one call.
    pub async fn ingest_from(&self, source: &dyn DocumentSource) -> Result<IngestReport, RagError> {
        let documents = source.load()?;
        self.ingest(&documents).await
    }

    pub async fn retrieve(
        &self,
        query: &str,
        n_results: usize,
    ) -> Result<RetrievalResult, RagError> {
        Ok(self.retriever.retrieve(query, n_results).await?)
    }

    pub fn count(&self) -> Result<usize, RagError> {
        Ok(self.store.count()?)
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}

/// Build the embedder described by the `embedding` config section.
pub fn build_embedder(cfg: &EmbeddingYamlConfig) -> Result<Arc<dyn EmbeddingPort>, RagError> {
    match cfg.provider {
        EmbeddingProvider::Hashing => {
            let mut embedder = HashingEmbedder::new(cfg.dimension)?;
            if let Some(name) = &cfg.model_name {
                embedder = embedder.with_model_name(name.clone());
            }
            Ok(Arc::new(embedder))
        }
        #[cfg(feature = "http")]
        EmbeddingProvider::Http => {
            let defaults = HttpEmbedderConfig::default();
            let http = HttpEmbedderConfig {
                url: cfg.url.clone().unwrap_or_default(),
                provider: cfg
                    .api
                    .as_deref()
                    .map(ApiProvider::from_name)
                    .unwrap_or_default(),
                model_name: cfg.model_name.clone().unwrap_or(defaults.model_name),
                auth_header: cfg.resolved_auth_header(),
                timeout_secs: cfg.timeout_secs,
                normalize: defaults.normalize,
            };
            Ok(Arc::new(HttpEmbedder::new(http)?))
        }
        #[cfg(not(feature = "http"))]
        EmbeddingProvider::Http => Err(RagError::Embed(EmbedError::InvalidConfig(
            "http embedder requires the `http` feature".into(),
        ))),
    }
}

/// One past the highest document ordinal found in the collection's record ids.
fn next_free_ordinal(store: &VectorStore) -> Result<u64, StoreError> {
    if store.count()? == 0 {
        return Ok(0);
    }
    let mut next = 0u64;
    store.scan_ids(&mut |id| {
        if let Some(ordinal) = id.split('_').next().and_then(|o| o.parse::<u64>().ok()) {
            next = next.max(ordinal + 1);
        }
    })?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_embedder_from_config() {
        let cfg = EmbeddingYamlConfig {
            dimension: 32,
            model_name: Some("demo".into()),
            ..Default::default()
        };
        let embedder = build_embedder(&cfg).unwrap();
        assert_eq!(embedder.model_name(), "demo");
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn http_embedder_needs_feature() {
        let cfg = EmbeddingYamlConfig {
            provider: EmbeddingProvider::Http,
            url: Some("http://localhost:8080/embed".into()),
            ..Default::default()
        };
        assert!(matches!(build_embedder(&cfg), Err(RagError::Embed(_))));
    }

    #[tokio::test]
    async fn reopened_system_continues_ordinals() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cfg = RagConfig::default();
        cfg.collection.backend = BackendConfig::redb(dir.path().join("rag.redb"));
        let embedder: Arc<dyn EmbeddingPort> = Arc::new(HashingEmbedder::new(16).unwrap());
        let doc = Document::new("A", "alpha beta gamma", "", "");

        {
            let system = RagSystem::open(&cfg, embedder.clone()).unwrap();
            system.ingest(&[doc.clone(), doc.clone()]).await.unwrap();
        }

        let system = RagSystem::open(&cfg, embedder).unwrap();
        assert_eq!(system.ingestor().next_ordinal(), 2);
        let report = system.ingest(&[doc]).await.unwrap();
        assert_eq!(report.first_ordinal, 2);
        assert_eq!(system.count().unwrap(), 3);
    }
}
