//! In-memory vector index with a slot → chunk registry
//!
//! Small indexes are scanned exhaustively. Past `exact_search_threshold`
//! vectors an hnsw_rs graph supplies candidates which are then rescored
//! exactly, so scores never depend on the graph.

use hnsw_rs::hnsw::Hnsw;
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, RetrievalResult, ScoredChunk};

/// Similarity metric, fixed for the lifetime of an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity, for normalized embeddings
    #[default]
    Cosine,
    /// Euclidean distance mapped to `1 / (1 + d)`
    L2,
}

impl Metric {
    /// Similarity between two vectors of equal width (higher is closer)
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(a, b),
            Metric::L2 => {
                let d: f32 = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt();
                1.0 / (1.0 + d)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::L2 => "l2",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// HNSW graph over the stored vectors, one variant per metric
enum AnnGraph {
    Cosine(Hnsw<'static, f32, DistCosine>),
    L2(Hnsw<'static, f32, DistL2>),
}

impl AnnGraph {
    fn new(metric: Metric, config: &IndexConfig, capacity: usize) -> Self {
        let max_layer = 16;
        let max_elements = capacity.max(1024);
        match metric {
            Metric::Cosine => AnnGraph::Cosine(Hnsw::<f32, DistCosine>::new(
                config.hnsw_m,
                max_elements,
                max_layer,
                config.ef_construction,
                DistCosine {},
            )),
            Metric::L2 => AnnGraph::L2(Hnsw::<f32, DistL2>::new(
                config.hnsw_m,
                max_elements,
                max_layer,
                config.ef_construction,
                DistL2 {},
            )),
        }
    }

    fn insert(&self, vector: &[f32], slot: usize) {
        match self {
            AnnGraph::Cosine(hnsw) => hnsw.insert_slice((vector, slot)),
            AnnGraph::L2(hnsw) => hnsw.insert_slice((vector, slot)),
        }
    }

    fn candidates(&self, query: &[f32], k: usize, ef: usize) -> Vec<usize> {
        let neighbours = match self {
            AnnGraph::Cosine(hnsw) => hnsw.search(query, k, ef),
            AnnGraph::L2(hnsw) => hnsw.search(query, k, ef),
        };
        neighbours.into_iter().map(|n| n.d_id).collect()
    }
}

/// Vector index with its chunk registry kept in lockstep
pub struct VectorIndex {
    dimensions: usize,
    metric: Metric,
    config: IndexConfig,
    vectors: Vec<Vec<f32>>,
    registry: Vec<Chunk>,
    graph: Option<AnnGraph>,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dimensions", &self.dimensions)
            .field("metric", &self.metric)
            .field("len", &self.vectors.len())
            .field("ann", &self.graph.is_some())
            .finish()
    }
}

impl VectorIndex {
    /// Create an empty index using the configured metric
    pub fn new(dimensions: usize, config: &IndexConfig) -> Result<Self> {
        Self::with_metric(dimensions, config.metric, config)
    }

    /// Create an empty index with an explicit metric
    pub fn with_metric(dimensions: usize, metric: Metric, config: &IndexConfig) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::InvalidInput("index dimensionality must be positive".into()));
        }
        Ok(Self {
            dimensions,
            metric,
            config: config.clone(),
            vectors: Vec::new(),
            registry: Vec::new(),
            graph: None,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Number of stored vectors (always equal to the registry length)
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Stored vectors in slot order
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Registry in slot order
    pub fn registry(&self) -> &[Chunk] {
        &self.registry
    }

    /// Chunk stored in `slot`
    pub fn chunk(&self, slot: usize) -> Option<&Chunk> {
        self.registry.get(slot)
    }

    /// Append vectors with their chunks.
    ///
    /// Everything is validated before the index is touched, so a failed call
    /// leaves it unchanged.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<()> {
        if vectors.len() != chunks.len() {
            return Err(Error::InvalidInput(format!(
                "{} vectors supplied for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }
        if let Some(pos) = vectors.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
            return Err(Error::InvalidInput(format!(
                "vector for chunk {} contains non-finite values",
                pos
            )));
        }

        let first_slot = self.vectors.len();
        self.vectors.extend(vectors);
        self.registry.extend(chunks);

        if let Some(graph) = &self.graph {
            for slot in first_slot..self.vectors.len() {
                graph.insert(&self.vectors[slot], slot);
            }
        } else if self.vectors.len() > self.config.exact_search_threshold {
            self.build_graph();
        }

        Ok(())
    }

    fn build_graph(&mut self) {
        tracing::info!(
            "Building HNSW graph over {} vectors (dim={}, metric={})",
            self.vectors.len(),
            self.dimensions,
            self.metric
        );
        let graph = AnnGraph::new(self.metric, &self.config, self.vectors.len());
        for (slot, vector) in self.vectors.iter().enumerate() {
            graph.insert(vector, slot);
        }
        self.graph = Some(graph);
    }

    /// Top-`k` chunks by descending similarity.
    ///
    /// An empty index or `k == 0` yields an empty result; `k` beyond the
    /// stored count is clamped.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        if query.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(RetrievalResult::default());
        }

        let mut scored: Vec<(usize, f32)> = match &self.graph {
            Some(graph) => {
                let ef = self.config.ef_search.max(k);
                let mut slots = graph.candidates(query, k, ef);
                slots.sort_unstable();
                slots.dedup();
                slots
                    .into_iter()
                    .filter(|&slot| slot < self.vectors.len())
                    .map(|slot| (slot, self.metric.similarity(query, &self.vectors[slot])))
                    .collect()
            }
            None => self
                .vectors
                .iter()
                .enumerate()
                .map(|(slot, v)| (slot, self.metric.similarity(query, v)))
                .collect(),
        };

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        let hits = scored
            .into_iter()
            .map(|(slot, score)| ScoredChunk {
                slot,
                score,
                chunk: self.registry[slot].clone(),
            })
            .collect();

        Ok(RetrievalResult { hits })
    }
}
