//! Pure assembly of a retrieval result from ranked hits.
//!
//! Nothing here re-sorts: hits arrive closest first from the store, and every
//! helper keeps that order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use store::QueryHit;

/// Most sources listed in a result.
pub const MAX_SOURCES: usize = 3;
/// Passages joined into the answer context.
pub const CONTEXT_PASSAGES: usize = 3;

/// A cited document, one per distinct title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub title: String,
    pub url: String,
    pub topic: String,
    /// `1 - distance`; higher is more relevant.
    pub relevance_score: f32,
}

/// First occurrence of each title, in hit order, capped at [`MAX_SOURCES`].
pub fn dedup_sources(hits: &[QueryHit]) -> Vec<SourceEntry> {
    let mut seen = HashSet::new();
    hits.iter()
        .filter(|hit| seen.insert(hit.metadata.title.as_str()))
        .take(MAX_SOURCES)
        .map(|hit| SourceEntry {
            title: hit.metadata.title.clone(),
            url: hit.metadata.url.clone(),
            topic: hit.metadata.topic.clone(),
            relevance_score: 1.0 - hit.distance,
        })
        .collect()
}

/// Text of the top [`CONTEXT_PASSAGES`] hits joined by blank lines, cut to
/// `char_budget` characters.
pub fn build_context(hits: &[QueryHit], char_budget: usize) -> String {
    let joined = hits
        .iter()
        .take(CONTEXT_PASSAGES)
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    match joined.char_indices().nth(char_budget) {
        Some((cut, _)) => joined[..cut].to_string(),
        None => joined,
    }
}

/// Template answer embedding `context`. Deterministic for identical input.
pub fn compose_answer(query: &str, context: &str) -> String {
    format!(
        "Based on the Wikipedia articles, here's what I found about your query: \"{query}\"\n\n\
         Context from Wikipedia:\n{context}...\n\n\
         This information comes from Wikipedia articles. For more detailed information, \
         please refer to the original sources."
    )
}

/// Answer used when the collection has nothing to offer.
pub fn empty_answer(query: &str) -> String {
    format!(
        "No relevant passages were found for your query: \"{query}\". \
         The knowledge base is empty or contains nothing related yet; \
         ingest some documents and try again."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::PassageMetadata;

    fn hit(title: &str, text: &str, distance: f32) -> QueryHit {
        QueryHit {
            id: format!("{title}_{distance}"),
            text: text.to_string(),
            metadata: PassageMetadata {
                title: title.to_string(),
                url: format!("https://en.wikipedia.org/wiki/{title}"),
                topic: "t".to_string(),
                chunk_index: 0,
                total_chunks: 1,
            },
            distance,
        }
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let hits = vec![
            hit("B", "b1", 0.1),
            hit("A", "a1", 0.2),
            hit("B", "b2", 0.3),
            hit("A", "a2", 0.4),
            hit("B", "b3", 0.5),
        ];
        let sources = dedup_sources(&hits);
        let titles: Vec<_> = sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert!((sources[0].relevance_score - 0.9).abs() < 1e-6);
        assert!((sources[1].relevance_score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn dedup_caps_at_three() {
        let hits: Vec<_> = ["A", "B", "C", "D", "E"]
            .iter()
            .enumerate()
            .map(|(i, t)| hit(t, "x", i as f32 * 0.1))
            .collect();
        let sources = dedup_sources(&hits);
        assert_eq!(sources.len(), MAX_SOURCES);
        assert_eq!(sources[2].title, "C");
    }

    #[test]
    fn context_uses_top_three() {
        let hits = vec![
            hit("A", "one", 0.1),
            hit("B", "two", 0.2),
            hit("C", "three", 0.3),
            hit("D", "four", 0.4),
        ];
        assert_eq!(build_context(&hits, 1500), "one\n\ntwo\n\nthree");
    }

    #[test]
    fn context_respects_char_budget() {
        let hits = vec![hit("A", "héllo wörld", 0.1)];
        assert_eq!(build_context(&hits, 4), "héll");
        assert_eq!(build_context(&hits, 100), "héllo wörld");
    }

    #[test]
    fn answer_embeds_query_and_context() {
        let answer = compose_answer("what is rust", "Rust is a language.");
        assert!(answer.contains("\"what is rust\""));
        assert!(answer.contains("Context from Wikipedia:\nRust is a language...."));
        assert!(answer.ends_with("please refer to the original sources."));
        assert_eq!(answer, compose_answer("what is rust", "Rust is a language."));
    }

    #[test]
    fn empty_answer_is_explanatory() {
        let answer = empty_answer("anything");
        assert!(answer.contains("anything"));
        assert!(answer.contains("No relevant passages"));
    }
}
