use super::*;
use tempfile::TempDir;

fn sample_chunk(text: &str, embedding: Vec<f32>) -> NewChunk {
    NewChunk {
        text: text.to_string(),
        original_text: text.to_string(),
        embedding,
        source: Some("physics.pdf".to_string()),
        page: Some(1),
        heading: None,
        section_type: None,
        is_feedback: false,
        extra_metadata: serde_json::Map::new(),
    }
}

#[tokio::test]
async fn insert_assigns_monotonic_ids() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path()).await.expect("store opens");

    let first = store
        .insert("physics", vec![sample_chunk("a", vec![1.0]), sample_chunk("b", vec![2.0])])
        .await
        .expect("insert");
    assert_eq!(first, vec![1, 2]);

    let second = store
        .insert("physics", vec![sample_chunk("c", vec![3.0])])
        .await
        .expect("insert");
    assert_eq!(second, vec![3]);
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path()).await.expect("store opens");

    store
        .insert("physics", vec![sample_chunk("newton", vec![1.0, 0.0])])
        .await
        .expect("insert");
    store
        .insert("biology", vec![sample_chunk("photosynthesis", vec![0.0, 1.0, 0.0])])
        .await
        .expect("insert");

    // Each namespace starts its own id sequence and dimension.
    let physics = store.list("physics").await.expect("list");
    let biology = store.list("biology").await.expect("list");
    assert_eq!(physics.len(), 1);
    assert_eq!(biology.len(), 1);
    assert_eq!(physics[0].id, 1);
    assert_eq!(biology[0].id, 1);
    assert_eq!(physics[0].embedding.len(), 2);
    assert_eq!(biology[0].embedding.len(), 3);
}

#[tokio::test]
async fn dimension_mismatch_rejected_without_mutation() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path()).await.expect("store opens");

    store
        .insert("physics", vec![sample_chunk("a", vec![1.0, 0.0])])
        .await
        .expect("insert");

    let err = store
        .insert(
            "physics",
            vec![sample_chunk("b", vec![1.0, 0.0]), sample_chunk("c", vec![1.0])],
        )
        .await
        .expect_err("mismatched batch must fail");
    assert!(matches!(
        err,
        crate::RetrievalError::DimensionMismatch {
            expected: 2,
            actual: 1
        }
    ));

    // Nothing from the failed batch may be persisted.
    let chunks = store.list("physics").await.expect("list");
    assert_eq!(chunks.len(), 1);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path()).await.expect("store opens");

    let err = store.insert("physics", Vec::new()).await.expect_err("empty batch");
    assert!(matches!(err, crate::RetrievalError::EmptyBatch));
}

#[tokio::test]
async fn chunks_survive_reopen() {
    let dir = TempDir::new().expect("tempdir");
    {
        let store = FileStore::new(dir.path()).await.expect("store opens");
        store
            .insert("physics", vec![sample_chunk("newton", vec![1.0, 2.0])])
            .await
            .expect("insert");
    }

    let reopened = FileStore::new(dir.path()).await.expect("store reopens");
    let chunks = reopened.list("physics").await.expect("list");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "newton");
    assert_eq!(chunks[0].embedding, vec![1.0, 2.0]);

    // Id assignment continues where it left off.
    let ids = reopened
        .insert("physics", vec![sample_chunk("force", vec![2.0, 3.0])])
        .await
        .expect("insert");
    assert_eq!(ids, vec![2]);
}

#[tokio::test]
async fn delete_namespace_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path()).await.expect("store opens");

    store
        .insert("physics", vec![sample_chunk("a", vec![1.0]), sample_chunk("b", vec![2.0])])
        .await
        .expect("insert");

    assert_eq!(store.delete_namespace("physics").await.expect("delete"), 2);
    assert_eq!(store.delete_namespace("physics").await.expect("delete again"), 0);
    assert_eq!(store.delete_namespace("never-existed").await.expect("absent"), 0);
    assert!(store.list("physics").await.expect("list").is_empty());
}

#[tokio::test]
async fn stats_count_feedback_and_sources() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path()).await.expect("store opens");

    let feedback = NewChunk::feedback("q", "a", vec![0.5]);
    let mut other_source = sample_chunk("chapter two", vec![1.5]);
    other_source.source = Some("slides.pdf".to_string());

    store
        .insert(
            "physics",
            vec![sample_chunk("chapter one", vec![1.0]), other_source, feedback],
        )
        .await
        .expect("insert");

    let stats = store.stats("physics").await.expect("stats");
    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.feedback_chunks, 1);
    assert_eq!(stats.unique_sources, 3);
    assert_eq!(stats.dimension, Some(1));
}

#[tokio::test]
async fn stats_for_unknown_namespace_are_empty() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path()).await.expect("store opens");

    let stats = store.stats("missing").await.expect("stats");
    assert_eq!(stats, NamespaceStats::empty());
}

#[tokio::test]
async fn namespace_names_with_slashes_are_encoded() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path()).await.expect("store opens");

    store
        .insert("course/physics 101", vec![sample_chunk("a", vec![1.0])])
        .await
        .expect("insert");

    let reopened = FileStore::new(dir.path()).await.expect("store reopens");
    let chunks = reopened.list("course/physics 101").await.expect("list");
    assert_eq!(chunks.len(), 1);
}
