#[cfg(test)]
mod tests;

use std::collections::HashMap;

/// Standard RRF k parameter from Cormack, Clarke & Buettcher (SIGIR 2009).
/// Smaller values emphasize top ranks; 60 is the recommended default.
pub const DEFAULT_RRF_K: usize = 60;

/// Per-chunk outcome of weighted fusion. The channel scores are the
/// max-normalized values in `[0, 1]`, not the raw index scores.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    pub chunk_id: i64,
    pub lexical: f32,
    pub vector: f32,
    pub combined: f32,
}

/// Fuse one lexical and one vector result list into a single ranking.
///
/// Candidates are merged by chunk id over the union of both lists; a chunk
/// missing from a channel contributes a raw score of 0 there. Each channel is
/// then normalized by its own maximum among the union members (a channel
/// whose maximum is 0 normalizes to all zeros), and the combined score is
/// `lexical_weight * lexical + vector_weight * vector`. Output is ordered by
/// combined score descending, ties broken by ascending chunk id.
///
/// Weights are not required to sum to 1; callers validate non-negativity.
#[inline]
pub fn weighted_fusion(
    lexical_results: &[(i64, f32)],
    vector_results: &[(i64, f32)],
    lexical_weight: f32,
    vector_weight: f32,
) -> Vec<FusedScore> {
    let mut raw: HashMap<i64, (f32, f32)> = HashMap::new();
    for &(chunk_id, score) in lexical_results {
        raw.entry(chunk_id).or_insert((0.0, 0.0)).0 = score;
    }
    for &(chunk_id, score) in vector_results {
        raw.entry(chunk_id).or_insert((0.0, 0.0)).1 = score;
    }

    let max_lexical = raw.values().map(|(l, _)| *l).fold(0.0_f32, f32::max);
    let max_vector = raw.values().map(|(_, v)| *v).fold(0.0_f32, f32::max);

    let mut fused: Vec<FusedScore> = raw
        .into_iter()
        .map(|(chunk_id, (lexical_raw, vector_raw))| {
            let lexical = if max_lexical > 0.0 {
                lexical_raw / max_lexical
            } else {
                0.0
            };
            let vector = if max_vector > 0.0 {
                vector_raw / max_vector
            } else {
                0.0
            };
            FusedScore {
                chunk_id,
                lexical,
                vector,
                combined: lexical_weight * lexical + vector_weight * vector,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    fused
}

/// Reciprocal Rank Fusion over any number of rankings.
///
/// `RRF_score(d) = sum over rankings r of 1 / (k + rank_r(d))` with 1-based
/// ranks; a chunk absent from a ranking contributes 0 from it. Needs no
/// score-scale compatibility between channels, which makes it the right tool
/// when raw channel scores are not comparable in magnitude. Exposed as an
/// independent strategy; the default hybrid path uses [`weighted_fusion`].
#[inline]
pub fn reciprocal_rank_fusion(rankings: &[Vec<i64>], k: usize) -> Vec<(i64, f32)> {
    let k = k as f32;
    let mut scores: HashMap<i64, f32> = HashMap::new();

    for ranking in rankings {
        for (position, chunk_id) in ranking.iter().enumerate() {
            let rank = (position + 1) as f32;
            *scores.entry(*chunk_id).or_insert(0.0) += 1.0 / (k + rank);
        }
    }

    let mut fused: Vec<(i64, f32)> = scores.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    fused
}
