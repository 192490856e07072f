//! Failure propagation from the embedding port and the store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wikirag::{
    ChunkConfig, Document, EmbedError, EmbeddingPort, HashingEmbedder, IngestConfig, IngestError,
    Ingestor, RagConfig, RagError, RagSystem, RetrievalConfig, RetrieveError, Retriever,
    StoreConfig, StoreError, VectorStore,
};

/// Delegates to a hashing embedder until `fail_on` calls have been made.
struct FlakyEmbedder {
    inner: HashingEmbedder,
    calls: AtomicUsize,
    fail_on: usize,
}

#[async_trait]
impl EmbeddingPort for FlakyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_on {
            return Err(EmbedError::Backend("model server unavailable".into()));
        }
        self.inner.embed(texts).await
    }
}

struct SlowEmbedder;

#[async_trait]
impl EmbeddingPort for SlowEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(texts.iter().map(|_| vec![1.0; 8]).collect())
    }
}

fn docs(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| Document::new(format!("Doc {i}"), format!("body of document {i}"), "", ""))
        .collect()
}

#[tokio::test]
async fn failing_batch_reports_progress() {
    let mut cfg = RagConfig::default();
    cfg.ingest.batch_size = 2;
    let embedder = Arc::new(FlakyEmbedder {
        inner: HashingEmbedder::new(32).unwrap(),
        calls: AtomicUsize::new(0),
        fail_on: 2,
    });
    let system = RagSystem::open(&cfg, embedder).unwrap();

    let err = system.ingest(&docs(5)).await.unwrap_err();
    match err {
        RagError::Ingest(inner) => {
            assert_eq!(inner.failed_batch(), Some(2));
            assert_eq!(inner.committed(), 4);
            assert!(matches!(inner, IngestError::Embedding { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(system.count().unwrap(), 4);

    let err = system.retrieve("document", 3).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Retrieve(RetrieveError::Embedding(EmbedError::Backend(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_embedder_times_out() {
    let mut cfg = RagConfig::default();
    cfg.ingest.embed_timeout_ms = Some(1_000);
    cfg.retrieval = RetrievalConfig::default().with_embed_timeout(Duration::from_millis(500));
    let system = RagSystem::open(&cfg, Arc::new(SlowEmbedder)).unwrap();

    let err = system.ingest(&docs(1)).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Ingest(IngestError::Embedding {
            batch: 0,
            committed: 0,
            source: EmbedError::Timeout { after_ms: 1_000 },
        })
    ));

    let err = system.retrieve("anything", 1).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Retrieve(RetrieveError::Embedding(EmbedError::Timeout { after_ms: 500 }))
    ));
    assert_eq!(system.count().unwrap(), 0);
}

#[tokio::test]
async fn embedder_dimension_change_is_rejected() {
    let store = Arc::new(VectorStore::open(StoreConfig::default()).unwrap());
    let wide = Ingestor::new(
        Arc::clone(&store),
        Arc::new(HashingEmbedder::new(64).unwrap()),
        IngestConfig::default(),
    )
    .unwrap();
    wide.ingest(&docs(2)).await.unwrap();

    let narrow: Arc<dyn EmbeddingPort> = Arc::new(HashingEmbedder::new(32).unwrap());
    let ingestor = Ingestor::new(Arc::clone(&store), Arc::clone(&narrow), IngestConfig::default())
        .unwrap()
        .with_first_ordinal(2);
    let err = ingestor.ingest(&docs(1)).await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::Store {
            batch: 0,
            committed: 0,
            source: StoreError::DimensionMismatch {
                expected: 64,
                got: 32
            },
        }
    ));

    let retriever = Retriever::new(Arc::clone(&store), narrow, RetrievalConfig::default()).unwrap();
    let err = retriever.retrieve("document", 2).await.unwrap_err();
    assert!(matches!(
        err,
        RetrieveError::Store(StoreError::DimensionMismatch {
            expected: 64,
            got: 32
        })
    ));
    assert_eq!(store.count().unwrap(), 2);
}

#[tokio::test]
async fn invalid_requests_fail_before_any_work() {
    let embedder = Arc::new(FlakyEmbedder {
        inner: HashingEmbedder::new(16).unwrap(),
        calls: AtomicUsize::new(0),
        fail_on: usize::MAX,
    });
    let system = RagSystem::open(&RagConfig::default(), embedder.clone()).unwrap();

    let err = system.retrieve("   ", 5).await.unwrap_err();
    assert!(matches!(err, RagError::Retrieve(RetrieveError::InvalidRequest(_))));
    let err = system.retrieve("query", 0).await.unwrap_err();
    assert!(matches!(err, RagError::Retrieve(RetrieveError::InvalidRequest(_))));

    let err = system
        .ingest(&[Document::new("", "content", "", "")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RagError::Ingest(IngestError::InvalidDocument { index: 0, .. })
    ));
    assert_eq!(system.ingestor().next_ordinal(), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn invalid_chunking_is_rejected_at_open() {
    let mut cfg = RagConfig::default();
    cfg.chunking = ChunkConfig::new(50, 50);
    let err = RagSystem::open(&cfg, Arc::new(HashingEmbedder::new(8).unwrap()))
        .err()
        .unwrap();
    assert!(matches!(err, RagError::Config(_)));
}
