//! Ingest-then-retrieve scenarios through the `RagSystem` facade.

use std::sync::Arc;

use wikirag::{
    chunk_spans, ChunkConfig, Document, EmbeddingPort, HashingEmbedder, RagConfig, RagSystem,
};

fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn system() -> (RagSystem, Arc<HashingEmbedder>) {
    let embedder = Arc::new(HashingEmbedder::new(384).unwrap());
    let port: Arc<dyn EmbeddingPort> = embedder.clone();
    let system = RagSystem::open(&RagConfig::default(), port).unwrap();
    (system, embedder)
}

#[test]
fn default_chunking_of_1200_words() {
    let spans = chunk_spans(1200, &ChunkConfig::default()).unwrap();
    let bounds: Vec<_> = spans.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(bounds, vec![(0, 500), (450, 950), (900, 1200)]);
    assert_eq!(spans[2].len(), 300);
}

#[tokio::test]
async fn two_documents_produce_ordinal_chunk_ids() {
    let (system, _) = system();
    let docs = vec![
        Document::new(
            "Photosynthesis",
            words("leaf", 1200),
            "https://en.wikipedia.org/wiki/Photosynthesis",
            "biology",
        ),
        Document::new(
            "Chlorophyll",
            words("pigment", 600),
            "https://en.wikipedia.org/wiki/Chlorophyll",
            "biology",
        ),
    ];

    let report = system.ingest(&docs).await.unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.total_passages, 5);
    assert_eq!(report.first_ordinal, 0);
    assert_eq!(system.count().unwrap(), 5);

    for id in ["0_0", "0_1", "0_2", "1_0", "1_1"] {
        let record = system.store().get(id).unwrap();
        assert!(record.is_some(), "missing record {id}");
    }

    let last = system.store().get("0_2").unwrap().unwrap();
    assert_eq!(last.metadata.chunk_index, 2);
    assert_eq!(last.metadata.total_chunks, 3);
    assert_eq!(last.text.split(' ').count(), 300);
    assert_eq!(last.metadata.title, "Photosynthesis");
}

#[tokio::test]
async fn sources_are_deduplicated_in_first_seen_order() {
    let (system, embedder) = system();
    let docs = vec![
        Document::new("Photosynthesis", words("leaf", 1200), "u1", "biology"),
        Document::new("Chlorophyll", words("pigment", 600), "u2", "biology"),
    ];
    system.ingest(&docs).await.unwrap();

    let query = "leaf12 pigment3 leaf470";
    let result = system.retrieve(query, 5).await.unwrap();
    assert_eq!(result.query, query);
    assert_eq!(result.retrieved_chunk_count, 5);
    assert_eq!(result.sources.len(), 2);

    let hits = system
        .store()
        .query(&embedder.embed_one(query), 5)
        .unwrap();
    let mut expected: Vec<&str> = Vec::new();
    for hit in &hits {
        if !expected.contains(&hit.metadata.title.as_str()) {
            expected.push(&hit.metadata.title);
        }
    }
    let titles: Vec<&str> = result.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, expected);

    let scores: Vec<f32> = result.sources.iter().map(|s| s.relevance_score).collect();
    assert!(scores[0] >= scores[1]);
    assert!(result.answer.contains(query));
}

#[tokio::test]
async fn exact_passage_query_ranks_it_first() {
    let (system, _) = system();
    let docs = vec![
        Document::new("Volcano", "magma erupts through the crust", "u1", "geology"),
        Document::new("Glacier", "ice moves slowly down the valley", "u2", "geology"),
        Document::new("Desert", "sand dunes shift in the wind", "u3", "geography"),
    ];
    system.ingest(&docs).await.unwrap();

    let result = system
        .retrieve("ice moves slowly down the valley", 3)
        .await
        .unwrap();
    assert_eq!(result.sources[0].title, "Glacier");
    assert!((result.sources[0].relevance_score - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn empty_collection_returns_explanatory_answer() {
    let (system, _) = system();
    let result = system.retrieve("anything", 5).await.unwrap();
    assert_eq!(result.retrieved_chunk_count, 0);
    assert!(result.sources.is_empty());
    assert!(!result.answer.trim().is_empty());
}

#[tokio::test]
async fn ingest_from_json_source() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = wikirag::JsonFileSource::new(dir.path().join("articles.json"));
    source
        .save(&[
            Document::new("Moon", "the moon orbits the earth", "u1", "astronomy"),
            Document::new("Sun", "the sun is a star", "u2", "astronomy"),
        ])
        .unwrap();

    let (system, _) = system();
    let report = system.ingest_from(&source).await.unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(system.count().unwrap(), 2);
}
