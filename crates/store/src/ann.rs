//! Nearest-neighbour search over the in-memory copy of a collection's vectors.
//!
//! Small collections are scanned exactly. Cosine collections at or above
//! `min_vectors_for_ann` are served through an HNSW graph (`hnsw_rs`); its
//! candidates are re-scored with the exact metric, so callers always get
//! results in non-decreasing distance order with ties broken by id.

use crate::DistanceMetric;
use hashbrown::HashMap;
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Configuration for ANN index construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnConfig {
    /// Number of neighbors per node (higher = better recall, slower build).
    pub m: usize,
    /// Candidate list size during construction.
    pub ef_construction: usize,
    /// Candidate list size during search.
    pub ef_search: usize,
    /// Whether to use HNSW at all.
    pub enabled: bool,
    /// Below this many vectors, linear scan is used even if enabled.
    pub min_vectors_for_ann: usize,
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            enabled: true,
            min_vectors_for_ann: 1000,
        }
    }
}

impl AnnConfig {
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_vectors_for_ann(mut self, min: usize) -> Self {
        self.min_vectors_for_ann = min;
        self
    }

    /// Check if ANN should be used given the current dataset size.
    pub fn should_use_ann(&self, num_vectors: usize) -> bool {
        self.enabled && num_vectors >= self.min_vectors_for_ann
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.m == 0 {
            return Err("ann.m must be greater than zero".into());
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err("ann.ef_construction and ann.ef_search must be greater than zero".into());
        }
        Ok(())
    }
}

/// Id and exact distance of one neighbour.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnResult {
    pub id: String,
    pub distance: f32,
}

/// Vectors of one collection plus an optional HNSW graph over them.
///
/// Once built, the graph grows in place: new ids are inserted into it until
/// its capacity is reached. Overwriting an id's vector or running out of
/// capacity marks the index unbuilt, and the next [`AnnIndex::build`]
/// starts a fresh graph.
pub struct AnnIndex {
    config: AnnConfig,
    metric: DistanceMetric,
    dimension: usize,
    hnsw: Option<Hnsw<'static, f32, DistCosine>>,
    /// Points the current graph was sized for.
    graph_capacity: usize,
    /// Points inserted into the current graph.
    graph_len: usize,
    graph_builds: usize,
    id_to_index: HashMap<String, usize>,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    /// Positions of all-zero vectors. Cosine graphs leave them out and
    /// every search re-scores them directly.
    zero_norm: Vec<usize>,
    built: bool,
}

impl AnnIndex {
    pub fn new(dimension: usize, metric: DistanceMetric, config: AnnConfig) -> Self {
        Self {
            config,
            metric,
            dimension,
            hnsw: None,
            graph_capacity: 0,
            graph_len: 0,
            graph_builds: 0,
            id_to_index: HashMap::new(),
            ids: Vec::new(),
            vectors: Vec::new(),
            zero_norm: Vec::new(),
            built: false,
        }
    }

    /// Insert a vector, replacing any previous vector stored under `id`.
    pub fn upsert(&mut self, id: &str, vector: Vec<f32>) -> Result<(), AnnError> {
        if vector.len() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let zero = is_zero(&vector);

        if let Some(&index) = self.id_to_index.get(id) {
            self.vectors[index] = vector;
            self.zero_norm.retain(|&z| z != index);
            if zero {
                self.zero_norm.push(index);
            }
            // The graph still holds the old vector.
            if self.hnsw.is_some() {
                self.built = false;
            }
            return Ok(());
        }

        let index = self.vectors.len();
        self.vectors.push(vector);
        self.ids.push(id.to_string());
        self.id_to_index.insert(id.to_string(), index);
        if zero {
            self.zero_norm.push(index);
        }

        if !self.built {
            return Ok(());
        }
        match self.hnsw.as_ref() {
            Some(_) if zero => {}
            Some(hnsw) if self.graph_len < self.graph_capacity => {
                hnsw.insert_slice((self.vectors[index].as_slice(), index));
                self.graph_len += 1;
            }
            Some(_) => self.built = false,
            None if self.wants_graph() => self.built = false,
            None => {}
        }
        Ok(())
    }

    /// Up to `k` nearest vectors, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<AnnResult>, AnnError> {
        if query.len() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = match self.hnsw.as_ref() {
            Some(hnsw) if self.uses_hnsw() && !is_zero(query) => {
                let ef = self.config.ef_search.max(k);
                let mut candidates: Vec<usize> = hnsw
                    .search(query, ef, ef)
                    .into_iter()
                    .map(|neighbour| neighbour.get_origin_id())
                    .filter(|&idx| idx < self.vectors.len())
                    .collect();
                candidates.extend_from_slice(&self.zero_norm);
                candidates.sort_unstable();
                candidates.dedup();
                candidates
            }
            _ => (0..self.vectors.len()).collect::<Vec<usize>>(),
        };

        Ok(self.rank(query, candidates, k))
    }

    /// Exact re-scoring and ordering of candidate positions.
    fn rank(&self, query: &[f32], candidates: Vec<usize>, k: usize) -> Vec<AnnResult> {
        let mut scored: Vec<(usize, f32)> = candidates
            .into_iter()
            .map(|idx| (idx, self.metric.distance(query, &self.vectors[idx])))
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.ids[a.0].cmp(&self.ids[b.0]))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(idx, distance)| AnnResult {
                id: self.ids[idx].clone(),
                distance,
            })
            .collect()
    }

    /// Stored ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.ids.iter().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// True when an HNSW graph covers every stored vector.
    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn uses_hnsw(&self) -> bool {
        self.built && self.hnsw.is_some() && self.config.should_use_ann(self.vectors.len())
    }

    /// Number of HNSW graphs built from scratch so far.
    pub fn graph_builds(&self) -> usize {
        self.graph_builds
    }

    /// Cosine collections with at least `min_vectors_for_ann` (and at least
    /// 10) vectors are served from a graph.
    fn wants_graph(&self) -> bool {
        let n = self.vectors.len();
        self.metric == DistanceMetric::Cosine && self.config.should_use_ann(n) && n >= 10
    }

    /// Build a fresh HNSW graph when the collection qualifies, sized at twice
    /// the current vector count.
    pub fn build(&mut self) {
        self.hnsw = None;
        self.graph_capacity = 0;
        self.graph_len = 0;
        if !self.wants_graph() {
            self.built = true;
            return;
        }

        let capacity = self.vectors.len() * 2;
        let nb_layer = 16.min((capacity as f32).ln().trunc() as usize).max(1);
        let hnsw = Hnsw::<f32, DistCosine>::new(
            self.config.m,
            capacity,
            nb_layer,
            self.config.ef_construction,
            DistCosine {},
        );

        let data_for_insertion: Vec<(&Vec<f32>, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(_, vec)| !is_zero(vec))
            .map(|(idx, vec)| (vec, idx))
            .collect();
        hnsw.parallel_insert(&data_for_insertion);

        self.graph_len = data_for_insertion.len();
        self.graph_capacity = capacity;
        self.graph_builds += 1;
        self.hnsw = Some(hnsw);
        self.built = true;
    }
}

fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|&v| v == 0.0)
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AnnError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
