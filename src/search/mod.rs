// Search module
// Lexical (BM25) and vector indices plus the fusion strategies that
// combine their results into one ranking.

pub mod fusion;
pub mod lexical;
pub mod vector;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use fusion::{DEFAULT_RRF_K, FusedScore, reciprocal_rank_fusion, weighted_fusion};
pub use lexical::LexicalIndex;
pub use vector::{Metric, VectorIndex};

/// One ranked result as returned to the answer-generation collaborator.
///
/// `lexical_score` and `vector_score` are the max-normalized per-channel
/// scores in `[0, 1]`; `hybrid_score` is their weighted combination. For the
/// vector-only fallback path `lexical_score` is 0 and `hybrid_score` equals
/// `vector_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub text: String,
    pub original_text: String,
    pub source: Option<String>,
    pub page: Option<i64>,
    pub heading: Option<String>,
    pub is_feedback: bool,
    #[serde(default)]
    pub extra_metadata: Map<String, Value>,
    pub lexical_score: f32,
    pub vector_score: f32,
    pub hybrid_score: f32,
}
