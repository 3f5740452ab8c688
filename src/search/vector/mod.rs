
use crate::{Result, RetrievalError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Distance metric used by a vector index.
///
/// Both metrics are mapped into a similarity in `[0, 1]` so the fusion layer
/// never has to know which backend produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `similarity = 1 / (1 + squared_distance)`. Used by the file backend.
    #[default]
    SquaredEuclidean,
    /// `similarity = 1 - cosine_distance`, clamped to `[0, 1]`. Used by the
    /// database backend.
    Cosine,
}

/// Exact nearest-neighbor search over a flat list of embeddings.
///
/// Corpora are small (one course per namespace), so a brute-force scan beats
/// the complexity of an approximate structure. Unlike the lexical index,
/// inserts are truly incremental: `add` appends without touching existing
/// entries.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    metric: Metric,
    dimension: Option<usize>,
    entries: Vec<(i64, Vec<f32>)>,
}

impl VectorIndex {
    #[inline]
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            dimension: None,
            entries: Vec::new(),
        }
    }

    /// Append one embedding. The first insert fixes the index dimension;
    /// later inserts with a different length are rejected.
    #[inline]
    pub fn add(&mut self, chunk_id: i64, embedding: Vec<f32>) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != embedding.len() => {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            Some(_) => {}
            None => self.dimension = Some(embedding.len()),
        }
        self.entries.push((chunk_id, embedding));
        Ok(())
    }

    /// Return up to `top_k` `(chunk_id, similarity)` pairs, ordered by
    /// similarity descending with ties broken by ascending chunk id.
    ///
    /// An empty index returns an empty vector; a query whose length does not
    /// match the index dimension fails with `DimensionMismatch`.
    #[inline]
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(i64, f32)>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(i64, f32)> = self
            .entries
            .iter()
            .map(|(id, embedding)| (*id, self.similarity(query, embedding)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        debug!(
            "Vector search returned {} results (index size {})",
            scored.len(),
            self.entries.len()
        );
        Ok(scored)
    }

    fn similarity(&self, query: &[f32], embedding: &[f32]) -> f32 {
        match self.metric {
            Metric::SquaredEuclidean => {
                let squared: f32 = query
                    .iter()
                    .zip(embedding)
                    .map(|(a, b)| {
                        let d = a - b;
                        d * d
                    })
                    .sum();
                1.0 / (1.0 + squared)
            }
            Metric::Cosine => {
                let dot: f32 = query.iter().zip(embedding).map(|(a, b)| a * b).sum();
                let norm_q: f32 = query.iter().map(|v| v * v).sum::<f32>().sqrt();
                let norm_e: f32 = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm_q == 0.0 || norm_e == 0.0 {
                    return 0.0;
                }
                let cosine_distance = 1.0 - dot / (norm_q * norm_e);
                (1.0 - cosine_distance).clamp(0.0, 1.0)
            }
        }
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
