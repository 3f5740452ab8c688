use super::*;

#[test]
fn union_covers_both_channels() {
    let lexical = vec![(1, 4.0), (2, 2.0)];
    let vector = vec![(2, 0.9), (3, 0.8)];

    let fused = weighted_fusion(&lexical, &vector, 0.3, 0.7);
    let ids: Vec<i64> = fused.iter().map(|f| f.chunk_id).collect();
    assert_eq!(fused.len(), 3);
    assert!(ids.contains(&1) && ids.contains(&2) && ids.contains(&3));
}

#[test]
fn channel_maximum_normalizes_to_one() {
    let lexical = vec![(1, 4.0), (2, 2.0)];
    let vector = vec![(2, 0.5), (3, 0.25)];

    let fused = weighted_fusion(&lexical, &vector, 0.3, 0.7);

    for score in &fused {
        assert!((0.0..=1.0).contains(&score.lexical));
        assert!((0.0..=1.0).contains(&score.vector));
    }

    let top_lexical = fused.iter().find(|f| f.chunk_id == 1).expect("id 1 present");
    assert!((top_lexical.lexical - 1.0).abs() < f32::EPSILON);
    let top_vector = fused.iter().find(|f| f.chunk_id == 2).expect("id 2 present");
    assert!((top_vector.vector - 1.0).abs() < f32::EPSILON);
}

#[test]
fn missing_channel_contributes_zero() {
    let lexical = vec![(1, 3.0)];
    let vector = vec![(2, 0.9)];

    let fused = weighted_fusion(&lexical, &vector, 0.5, 0.5);
    let only_lexical = fused.iter().find(|f| f.chunk_id == 1).expect("present");
    assert_eq!(only_lexical.vector, 0.0);
    let only_vector = fused.iter().find(|f| f.chunk_id == 2).expect("present");
    assert_eq!(only_vector.lexical, 0.0);
}

#[test]
fn all_zero_channel_does_not_divide_by_zero() {
    let lexical: Vec<(i64, f32)> = Vec::new();
    let vector = vec![(1, 0.0), (2, 0.0)];

    let fused = weighted_fusion(&lexical, &vector, 0.3, 0.7);
    for score in &fused {
        assert_eq!(score.combined, 0.0);
        assert!(score.combined.is_finite());
    }
}

#[test]
fn combined_score_weights_channels() {
    let lexical = vec![(1, 2.0)];
    let vector = vec![(2, 0.9)];

    // All vector weight: the vector-only chunk must win.
    let fused = weighted_fusion(&lexical, &vector, 0.0, 1.0);
    assert_eq!(fused[0].chunk_id, 2);

    // All lexical weight: the lexical-only chunk must win.
    let fused = weighted_fusion(&lexical, &vector, 1.0, 0.0);
    assert_eq!(fused[0].chunk_id, 1);
}

#[test]
fn ties_break_by_ascending_id() {
    let lexical = vec![(9, 1.0), (4, 1.0)];
    let vector = vec![(9, 0.5), (4, 0.5)];

    let fused = weighted_fusion(&lexical, &vector, 0.3, 0.7);
    assert_eq!(fused[0].chunk_id, 4);
    assert_eq!(fused[1].chunk_id, 9);
}

#[test]
fn fusion_is_deterministic() {
    let lexical = vec![(1, 2.5), (2, 1.5), (3, 0.5)];
    let vector = vec![(3, 0.9), (1, 0.6), (4, 0.3)];

    let first = weighted_fusion(&lexical, &vector, 0.3, 0.7);
    let second = weighted_fusion(&lexical, &vector, 0.3, 0.7);
    assert_eq!(first, second);
}

#[test]
fn rrf_exact_arithmetic() {
    // Ranking A = [x, y, z], ranking B = [y, x, w] with ids x=1, y=2, z=3, w=4.
    let rankings = vec![vec![1, 2, 3], vec![2, 1, 4]];
    let fused = reciprocal_rank_fusion(&rankings, DEFAULT_RRF_K);

    let score = |id: i64| {
        fused
            .iter()
            .find(|(chunk_id, _)| *chunk_id == id)
            .map(|(_, s)| *s)
            .expect("id present")
    };

    assert!((score(1) - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-6);
    assert!((score(2) - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-6);
    assert!((score(3) - 1.0 / 63.0).abs() < 1e-6);
    assert!((score(4) - 1.0 / 63.0).abs() < 1e-6);

    // x and y have symmetric ranks, so their scores tie and ascending id wins.
    assert_eq!(fused[0].0, 1);
    assert_eq!(fused[1].0, 2);
}

#[test]
fn rrf_absent_chunks_contribute_nothing() {
    let rankings = vec![vec![1, 2], Vec::new(), vec![2]];
    let fused = reciprocal_rank_fusion(&rankings, DEFAULT_RRF_K);

    // Chunk 2: rank 2 in A plus rank 1 in C beats chunk 1's single rank 1.
    assert_eq!(fused[0].0, 2);
    assert_eq!(fused.len(), 2);
}

#[test]
fn rrf_empty_input_returns_empty() {
    assert!(reciprocal_rank_fusion(&[], DEFAULT_RRF_K).is_empty());
    let rankings: Vec<Vec<i64>> = vec![Vec::new(), Vec::new()];
    assert!(reciprocal_rank_fusion(&rankings, DEFAULT_RRF_K).is_empty());
}

#[test]
fn rrf_single_ranking_preserves_order() {
    let rankings = vec![vec![5, 1, 9]];
    let fused = reciprocal_rank_fusion(&rankings, DEFAULT_RRF_K);
    let ids: Vec<i64> = fused.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![5, 1, 9]);
}
