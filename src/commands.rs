use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::{BackendKind, Config, get_config_dir};
use crate::engine::RetrievalEngine;
use crate::store::{AnyStore, FileStore, NewChunk, SqliteStore};

/// Open the engine over whichever backend the configuration selects.
#[inline]
pub async fn open_engine() -> Result<RetrievalEngine<AnyStore>> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;
    open_engine_with(&config).await
}

#[inline]
pub async fn open_engine_with(config: &Config) -> Result<RetrievalEngine<AnyStore>> {
    let store = match config.backend {
        BackendKind::File => {
            let root = config.namespaces_path();
            AnyStore::File(
                FileStore::new(&root)
                    .await
                    .with_context(|| format!("Failed to open file store at {}", root.display()))?,
            )
        }
        BackendKind::Sqlite => {
            let path = config.database_path();
            AnyStore::Sqlite(
                SqliteStore::new(&path)
                    .await
                    .with_context(|| format!("Failed to open database at {}", path.display()))?,
            )
        }
    };
    Ok(RetrievalEngine::new(store, config.search))
}

/// Ingest a batch of pre-embedded chunks from a JSON file into a namespace.
///
/// The file holds a JSON array of chunk objects, each with its `text`,
/// `original_text`, `embedding` and optional provenance fields.
#[inline]
pub async fn ingest_chunks(namespace: &str, file: &Path) -> Result<()> {
    info!("Ingesting chunks from {} into '{}'", file.display(), namespace);

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read chunk file: {}", file.display()))?;
    let chunks: Vec<NewChunk> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chunk file: {}", file.display()))?;

    let mut embeddings = Vec::with_capacity(chunks.len());
    let mut metadatas = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let (embedding, meta) = chunk.into_parts();
        embeddings.push(embedding);
        metadatas.push(meta);
    }

    let engine = open_engine().await?;
    let report = engine.ingest(namespace, embeddings, metadatas).await?;

    println!(
        "Ingested {} chunks into '{}' ({} total)",
        report.added, namespace, report.total_docs
    );
    Ok(())
}

/// Run a hybrid search and print the ranked hits.
#[inline]
pub async fn search(
    namespace: &str,
    query: &str,
    embedding_file: &Path,
    top_k: usize,
    lexical_weight: Option<f32>,
    vector_weight: Option<f32>,
) -> Result<()> {
    let engine = open_engine().await?;
    let embedding = read_embedding(embedding_file)?;

    let lexical = lexical_weight.unwrap_or(engine.search_config().lexical_weight);
    let vector = vector_weight.unwrap_or(engine.search_config().vector_weight);

    let hits = engine
        .hybrid_search(namespace, query, &embedding, top_k, lexical, vector)
        .await?;

    if hits.is_empty() {
        println!("No results in namespace '{}'.", namespace);
        return Ok(());
    }

    println!("Results for \"{}\" in '{}':", query, namespace);
    for (rank, hit) in hits.iter().enumerate() {
        println!();
        println!(
            "{}. [chunk {}] score {:.4} (lexical {:.4}, vector {:.4})",
            rank + 1,
            hit.id,
            hit.hybrid_score,
            hit.lexical_score,
            hit.vector_score
        );
        if let Some(source) = &hit.source {
            match hit.page {
                Some(page) => println!("   {} (page {})", source, page),
                None => println!("   {}", source),
            }
        }
        if hit.is_feedback {
            println!("   [instructor feedback]");
        }
        println!("   {}", snippet(&hit.original_text));
    }
    Ok(())
}

/// Run the vector-only fallback path and print the ranked hits.
#[inline]
pub async fn vector_search(namespace: &str, embedding_file: &Path, top_k: usize) -> Result<()> {
    let engine = open_engine().await?;
    let embedding = read_embedding(embedding_file)?;

    let hits = engine.vector_search(namespace, &embedding, top_k).await?;

    if hits.is_empty() {
        println!("No results in namespace '{}'.", namespace);
        return Ok(());
    }

    println!("Nearest chunks in '{}':", namespace);
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{}. [chunk {}] similarity {:.4}  {}",
            rank + 1,
            hit.id,
            hit.vector_score,
            snippet(&hit.original_text)
        );
    }
    Ok(())
}

/// Record an instructor correction as a retrievable feedback chunk.
#[inline]
pub async fn add_feedback(
    namespace: &str,
    question: &str,
    corrected_answer: &str,
    embedding_file: &Path,
) -> Result<()> {
    let engine = open_engine().await?;
    let embedding = read_embedding(embedding_file)?;

    let report = engine
        .add_feedback(namespace, question, corrected_answer, embedding)
        .await?;

    println!(
        "Recorded feedback in '{}' ({} chunks total)",
        namespace, report.total_docs
    );
    Ok(())
}

/// Print aggregate counts for a namespace.
#[inline]
pub async fn show_stats(namespace: &str) -> Result<()> {
    let engine = open_engine().await?;
    let stats = engine.stats(namespace).await?;

    println!("Namespace '{}':", namespace);
    println!("  Chunks: {}", stats.total_chunks);
    println!("  Feedback chunks: {}", stats.feedback_chunks);
    println!("  Unique sources: {}", stats.unique_sources);
    match stats.dimension {
        Some(dimension) => println!("  Embedding dimension: {}", dimension),
        None => println!("  Embedding dimension: (no chunks yet)"),
    }
    Ok(())
}

/// Delete a namespace and everything in it.
#[inline]
pub async fn delete_namespace(namespace: &str) -> Result<()> {
    let engine = open_engine().await?;
    let report = engine.delete_namespace(namespace).await?;

    if report.deleted_count == 0 {
        println!("Namespace '{}' was already empty.", namespace);
    } else {
        println!(
            "Deleted namespace '{}' ({} chunks)",
            namespace, report.deleted_count
        );
    }
    Ok(())
}

/// Print the active configuration.
#[inline]
pub fn show_config() -> Result<()> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;

    println!("Configuration ({}):", config_dir.join("config.toml").display());
    println!("  Backend: {:?}", config.backend);
    match config.backend {
        BackendKind::File => {
            println!("  Data directory: {}", config.namespaces_path().display());
        }
        BackendKind::Sqlite => {
            println!("  Database: {}", config.database_path().display());
        }
    }
    println!("  Lexical weight: {}", config.search.lexical_weight);
    println!("  Vector weight: {}", config.search.vector_weight);
    println!("  BM25 k1: {}", config.search.bm25.k1);
    println!("  BM25 b: {}", config.search.bm25.b);
    Ok(())
}

/// Read a query embedding from a JSON file holding a flat array of floats.
fn read_embedding(path: &Path) -> Result<Vec<f32>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read embedding file: {}", path.display()))?;
    let embedding: Vec<f32> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse embedding file: {}", path.display()))?;
    Ok(embedding)
}

fn snippet(text: &str) -> String {
    const MAX: usize = 160;
    if text.chars().count() <= MAX {
        return text.replace('\n', " ");
    }
    let truncated: String = text.chars().take(MAX).collect();
    format!("{}...", truncated.replace('\n', " "))
}
