use super::*;
use crate::store::sqlite::SqliteStore;
use serde_json::json;
use tempfile::TempDir;

async fn create_test_store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = SqliteStore::new(dir.path().join("chunks.db"))
        .await
        .expect("store opens");
    (dir, store)
}

fn sample_chunk(text: &str, embedding: Vec<f32>) -> NewChunk {
    NewChunk {
        text: text.to_string(),
        original_text: text.to_string(),
        embedding,
        source: Some("textbook.pdf".to_string()),
        page: Some(4),
        heading: Some("Mechanics".to_string()),
        section_type: Some("paragraph".to_string()),
        is_feedback: false,
        extra_metadata: serde_json::Map::new(),
    }
}

#[test]
fn embedding_blob_round_trips() {
    let embedding = vec![0.0, 1.5, -2.25, f32::MIN_POSITIVE];
    let decoded = decode_embedding(&encode_embedding(&embedding)).expect("decodes");
    assert_eq!(decoded, embedding);
}

#[test]
fn truncated_blob_is_rejected() {
    let err = decode_embedding(&[0, 0, 0]).expect_err("bad length");
    assert!(matches!(err, RetrievalError::Storage(_)));
}

#[tokio::test]
async fn insert_and_list_round_trip() {
    let (_dir, store) = create_test_store().await;

    let mut chunk = sample_chunk("newton's first law", vec![0.25, -0.5]);
    chunk.extra_metadata.insert("week".to_string(), json!(3));

    let ids = ChunkQueries::insert_batch(store.pool(), "physics", vec![chunk.clone()])
        .await
        .expect("insert");
    assert_eq!(ids, vec![1]);

    let chunks = ChunkQueries::list(store.pool(), "physics").await.expect("list");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, 1);
    assert_eq!(chunks[0].namespace, "physics");
    assert_eq!(chunks[0].text, chunk.text);
    assert_eq!(chunks[0].embedding, chunk.embedding);
    assert_eq!(chunks[0].page, Some(4));
    assert_eq!(chunks[0].extra_metadata["week"], json!(3));
}

#[tokio::test]
async fn list_orders_by_ascending_id() {
    let (_dir, store) = create_test_store().await;

    ChunkQueries::insert_batch(
        store.pool(),
        "physics",
        vec![
            sample_chunk("first", vec![1.0]),
            sample_chunk("second", vec![2.0]),
            sample_chunk("third", vec![3.0]),
        ],
    )
    .await
    .expect("insert");

    let chunks = ChunkQueries::list(store.pool(), "physics").await.expect("list");
    let ids: Vec<i64> = chunks.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn dimension_mismatch_rolls_back_whole_batch() {
    let (_dir, store) = create_test_store().await;

    ChunkQueries::insert_batch(store.pool(), "physics", vec![sample_chunk("a", vec![1.0, 2.0])])
        .await
        .expect("insert");

    let err = ChunkQueries::insert_batch(
        store.pool(),
        "physics",
        vec![sample_chunk("b", vec![1.0, 2.0]), sample_chunk("c", vec![9.0])],
    )
    .await
    .expect_err("mismatched batch");
    assert!(matches!(
        err,
        RetrievalError::DimensionMismatch {
            expected: 2,
            actual: 1
        }
    ));

    let chunks = ChunkQueries::list(store.pool(), "physics").await.expect("list");
    assert_eq!(chunks.len(), 1, "failed batch must not persist any chunk");
}

#[tokio::test]
async fn ids_are_not_reused_across_batches() {
    let (_dir, store) = create_test_store().await;

    let first = ChunkQueries::insert_batch(
        store.pool(),
        "physics",
        vec![sample_chunk("a", vec![1.0]), sample_chunk("b", vec![2.0])],
    )
    .await
    .expect("insert");
    let second =
        ChunkQueries::insert_batch(store.pool(), "physics", vec![sample_chunk("c", vec![3.0])])
            .await
            .expect("insert");

    assert_eq!(first, vec![1, 2]);
    assert_eq!(second, vec![3]);
}

#[tokio::test]
async fn delete_namespace_reports_count() {
    let (_dir, store) = create_test_store().await;

    ChunkQueries::insert_batch(
        store.pool(),
        "physics",
        vec![sample_chunk("a", vec![1.0]), sample_chunk("b", vec![2.0])],
    )
    .await
    .expect("insert");

    assert_eq!(
        ChunkQueries::delete_namespace(store.pool(), "physics")
            .await
            .expect("delete"),
        2
    );
    assert_eq!(
        ChunkQueries::delete_namespace(store.pool(), "physics")
            .await
            .expect("delete again"),
        0
    );
}

#[tokio::test]
async fn stats_aggregate_counts() {
    let (_dir, store) = create_test_store().await;

    let mut slides = sample_chunk("b", vec![2.0]);
    slides.source = Some("slides.pdf".to_string());

    ChunkQueries::insert_batch(
        store.pool(),
        "physics",
        vec![
            sample_chunk("a", vec![1.0]),
            slides,
            NewChunk::feedback("q", "a", vec![3.0]),
        ],
    )
    .await
    .expect("insert");

    let stats = ChunkQueries::stats(store.pool(), "physics").await.expect("stats");
    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.feedback_chunks, 1);
    assert_eq!(stats.unique_sources, 3);
    assert_eq!(stats.dimension, Some(1));

    let empty = ChunkQueries::stats(store.pool(), "missing").await.expect("stats");
    assert_eq!(empty, NamespaceStats::empty());
}
