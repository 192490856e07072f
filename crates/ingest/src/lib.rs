//! Wikirag Ingest Layer
//!
//! This is where documents enter the retrieval system. Each document is split
//! into overlapping passages, the passages are embedded in batches, and the
//! resulting records are written to a [`VectorStore`](store::VectorStore).
//!
//! ## What we do here
//!
//! - **Assign ordinals** - every document gets the next value of an atomic
//!   counter, so concurrent `ingest` calls never hand out the same ordinal.
//! - **Chunk** - whitespace windows per [`ChunkConfig`](chunker::ChunkConfig).
//! - **Batch across documents** - passages from all documents of a call share
//!   batches, so small documents don't each cost an embedding call.
//! - **Fail fast** - the first failing batch stops the call. Earlier batches stay
//!   committed and the error says how many passages made it.
//!
//! Record ids are `{ordinal}_{chunk_index}`. Re-ingesting a document under a
//! new ordinal stores a second copy; reusing an ordinal (for instance a fresh
//! `Ingestor` over an existing collection) overwrites the old records. Use
//! [`Ingestor::with_first_ordinal`] to continue numbering after a restart.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use embed::HashingEmbedder;
//! use ingest::{Document, IngestConfig, Ingestor};
//! use store::{StoreConfig, VectorStore};
//!
//! let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
//! let store = Arc::new(VectorStore::open(StoreConfig::default()).unwrap());
//! let embedder = Arc::new(HashingEmbedder::new(64).unwrap());
//! let ingestor = Ingestor::new(store.clone(), embedder, IngestConfig::default()).unwrap();
//!
//! let docs = vec![Document::new("Rust", "Rust is a language.", "https://r", "programming")];
//! let report = rt.block_on(ingestor.ingest(&docs)).unwrap();
//!
//! assert_eq!(report.total_passages, 1);
//! assert_eq!(store.get("0_0").unwrap().unwrap().metadata.title, "Rust");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chunker::chunk_text;
use embed::{embed_batch, EmbeddingPort};
use serde::{Deserialize, Serialize};
use store::{PassageMetadata, StoreError, StoredRecord, VectorStore};
use tracing::{debug, info, info_span, warn, Instrument};

mod config;
mod document;
mod error;
mod source;

pub use crate::config::IngestConfig;
pub use crate::document::Document;
pub use crate::error::IngestError;
pub use crate::source::{DocumentSource, JsonFileSource};

/// Outcome of one `ingest` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents: usize,
    pub total_passages: usize,
    /// Embedding batches issued.
    pub batches: usize,
    /// Ordinal of the first document; the call used
    /// `first_ordinal..first_ordinal + documents`.
    pub first_ordinal: u64,
}

/// A passage waiting for its embedding.
struct PendingPassage {
    id: String,
    text: String,
    metadata: PassageMetadata,
}

/// Chunks, embeds and stores documents into one collection.
pub struct Ingestor {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingPort>,
    cfg: IngestConfig,
    next_ordinal: AtomicU64,
}

impl Ingestor {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingPort>,
        cfg: IngestConfig,
    ) -> Result<Self, IngestError> {
        cfg.validate()?;
        Ok(Self {
            store,
            embedder,
            cfg,
            next_ordinal: AtomicU64::new(0),
        })
    }

    /// Start ordinal numbering at `first` instead of 0.
    pub fn with_first_ordinal(self, first: u64) -> Self {
        self.next_ordinal.store(first, Ordering::SeqCst);
        self
    }

    /// The ordinal the next document will receive.
    pub fn next_ordinal(&self) -> u64 {
        self.next_ordinal.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Ingest `documents` in input order.
    ///
    /// Documents are validated before any ordinal is reserved. Documents with
    /// empty content take an ordinal but yield no passages.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport, IngestError> {
        let start = Instant::now();

        if let Some((index, reason)) = documents
            .iter()
            .enumerate()
            .find_map(|(i, doc)| doc.validate().err().map(|reason| (i, reason)))
        {
            let err = IngestError::InvalidDocument { index, reason };
            warn!(
                error = %err,
                elapsed_micros = start.elapsed().as_micros() as u64,
                "ingest_failure"
            );
            return Err(err);
        }

        let first_ordinal = self
            .next_ordinal
            .fetch_add(documents.len() as u64, Ordering::SeqCst);

        let span = info_span!(
            "ingest.ingest",
            documents = documents.len(),
            first_ordinal,
            model = %self.embedder.model_name()
        );

        match self
            .ingest_inner(documents, first_ordinal)
            .instrument(span)
            .await
        {
            Ok(report) => {
                info!(
                    documents = report.documents,
                    total_passages = report.total_passages,
                    batches = report.batches,
                    first_ordinal,
                    elapsed_micros = start.elapsed().as_micros() as u64,
                    "ingest_success"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(
                    documents = documents.len(),
                    first_ordinal,
                    failed_batch = ?err.failed_batch(),
                    committed = err.committed(),
                    error = %err,
                    elapsed_micros = start.elapsed().as_micros() as u64,
                    "ingest_failure"
                );
                Err(err)
            }
        }
    }

    async fn ingest_inner(
        &self,
        documents: &[Document],
        first_ordinal: u64,
    ) -> Result<IngestReport, IngestError> {
        let passages = self.chunk_documents(documents, first_ordinal)?;
        let timeout = self.cfg.embed_timeout();

        let mut committed = 0;
        let mut batches = 0;
        for (batch, chunk) in passages.chunks(self.cfg.batch_size).enumerate() {
            let texts: Vec<String> = chunk.iter().map(|p| p.text.clone()).collect();
            let vectors = embed_batch(self.embedder.as_ref(), &texts, timeout)
                .await
                .map_err(|source| IngestError::Embedding {
                    batch,
                    committed,
                    source,
                })?;

            let records: Vec<StoredRecord> = chunk
                .iter()
                .zip(vectors)
                .map(|(passage, embedding)| StoredRecord {
                    id: passage.id.clone(),
                    embedding,
                    text: passage.text.clone(),
                    metadata: passage.metadata.clone(),
                })
                .collect();

            let store = Arc::clone(&self.store);
            let written = tokio::task::spawn_blocking(move || store.add(&records))
                .await
                .map_err(StoreError::backend)
                .and_then(|result| result)
                .map_err(|source| IngestError::Store {
                    batch,
                    committed,
                    source,
                })?;

            committed += written;
            batches += 1;
            debug!(batch, written, committed, "ingest_batch");
        }

        Ok(IngestReport {
            documents: documents.len(),
            total_passages: committed,
            batches,
            first_ordinal,
        })
    }

    fn chunk_documents(
        &self,
        documents: &[Document],
        first_ordinal: u64,
    ) -> Result<Vec<PendingPassage>, IngestError> {
        let mut passages = Vec::new();
        for (offset, doc) in documents.iter().enumerate() {
            let ordinal = first_ordinal + offset as u64;
            let chunks = chunk_text(&doc.content, &self.cfg.chunking)?;
            let total_chunks = chunks.len();
            passages.extend(chunks.into_iter().enumerate().map(|(chunk_index, text)| {
                PendingPassage {
                    id: format!("{ordinal}_{chunk_index}"),
                    text,
                    metadata: PassageMetadata {
                        title: doc.title.clone(),
                        url: doc.url.clone(),
                        topic: doc.topic.clone(),
                        chunk_index,
                        total_chunks,
                    },
                }
            }));
        }
        Ok(passages)
    }
}
