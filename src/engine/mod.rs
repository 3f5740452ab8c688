
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::search::{LexicalIndex, SearchHit, VectorIndex, weighted_fusion};
use crate::store::{Chunk, ChunkMeta, ChunkStore, DeleteReport, IngestReport, NamespaceStats};
use crate::store::models::NewChunk;
use crate::{Result, RetrievalError};

/// The retrieval engine: one chunk store plus a lexical/vector index pair per
/// namespace.
///
/// Indices are in-memory and rebuilt lazily from the store on first access,
/// so both backends share the exact same search code and cannot diverge.
/// Each namespace's index pair sits behind its own `RwLock`: queries hold
/// read access concurrently, an ingestion holds exclusive access across the
/// store insert, the vector extension and the lexical rebuild, so a reader
/// always observes both indices over the same chunk set.
///
/// Embeddings are supplied by the caller; the engine never loads or owns an
/// embedding model.
pub struct RetrievalEngine<S> {
    store: S,
    search: SearchConfig,
    namespaces: RwLock<HashMap<String, Arc<RwLock<NamespaceIndex>>>>,
}

struct NamespaceIndex {
    lexical: LexicalIndex,
    vector: VectorIndex,
}

impl<S: ChunkStore> RetrievalEngine<S> {
    #[inline]
    pub fn new(store: S, search: SearchConfig) -> Self {
        Self {
            store,
            search,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    /// Ingest a batch of `(embedding, metadata)` pairs into a namespace.
    ///
    /// Validation happens before any mutation: the two lists must have equal
    /// length and every embedding must match the namespace's dimension. An
    /// empty batch is a no-op, not an error. The namespace is created
    /// implicitly on its first ingestion.
    #[inline]
    pub async fn ingest(
        &self,
        namespace: &str,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<ChunkMeta>,
    ) -> Result<IngestReport> {
        if embeddings.len() != metadatas.len() {
            return Err(RetrievalError::BatchLengthMismatch {
                embeddings: embeddings.len(),
                metadatas: metadatas.len(),
            });
        }
        if embeddings.is_empty() {
            let stats = self.store.stats(namespace).await?;
            return Ok(IngestReport {
                added: 0,
                total_docs: stats.total_chunks as usize,
            });
        }

        let chunks = metadatas
            .into_iter()
            .zip(embeddings)
            .map(|(meta, embedding)| meta.with_embedding(embedding))
            .collect();
        self.ingest_chunks(namespace, chunks).await
    }

    /// Fold an instructor correction back into the index as one synthetic
    /// chunk, so the corrected answer becomes retrievable context for future
    /// queries.
    #[inline]
    pub async fn add_feedback(
        &self,
        namespace: &str,
        question: &str,
        corrected_answer: &str,
        embedding: Vec<f32>,
    ) -> Result<IngestReport> {
        let chunk = NewChunk::feedback(question, corrected_answer, embedding);
        self.ingest_chunks(namespace, vec![chunk]).await
    }

    async fn ingest_chunks(
        &self,
        namespace: &str,
        chunks: Vec<NewChunk>,
    ) -> Result<IngestReport> {
        let entry = self.namespace_entry(namespace).await?;
        // Exclusive for the whole insert-extend-rebuild sequence: this is
        // what keeps the two indices consistent for concurrent readers and
        // serializes writers per namespace.
        let mut index = entry.write().await;

        let embeddings: Vec<Vec<f32>> = chunks.iter().map(|c| c.embedding.clone()).collect();
        let ids = self.store.insert(namespace, chunks).await?;

        for (id, embedding) in ids.iter().zip(embeddings) {
            index.vector.add(*id, embedding)?;
        }

        let all_chunks = self.store.list(namespace).await?;
        index
            .lexical
            .rebuild(all_chunks.iter().map(|c| (c.id, c.text.as_str())));

        info!(
            "Ingested {} chunks into namespace '{}' ({} total)",
            ids.len(),
            namespace,
            all_chunks.len()
        );
        Ok(IngestReport {
            added: ids.len(),
            total_docs: all_chunks.len(),
        })
    }

    /// Answer a query by fusing keyword and vector relevance.
    ///
    /// Both channels are over-fetched at `top_k * 2` so a chunk ranked low in
    /// one channel but high in the other can still surface in the fused
    /// top-k. An empty or unknown namespace returns an empty list; a query
    /// embedding of the wrong length fails with `DimensionMismatch`.
    #[inline]
    pub async fn hybrid_search(
        &self,
        namespace: &str,
        query: &str,
        query_embedding: &[f32],
        top_k: usize,
        lexical_weight: f32,
        vector_weight: f32,
    ) -> Result<Vec<SearchHit>> {
        if lexical_weight < 0.0 || vector_weight < 0.0 {
            return Err(RetrievalError::InvalidWeight {
                lexical: lexical_weight,
                vector: vector_weight,
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let entry = self.namespace_entry(namespace).await?;
        let index = entry.read().await;
        if index.vector.is_empty() {
            return Ok(Vec::new());
        }

        let fetch = top_k * 2;
        let lexical_results = index.lexical.search(query, fetch);
        let vector_results = index.vector.search(query_embedding, fetch)?;
        drop(index);

        let mut fused = weighted_fusion(
            &lexical_results,
            &vector_results,
            lexical_weight,
            vector_weight,
        );
        fused.truncate(top_k);

        debug!(
            "Hybrid search in '{}': {} lexical, {} vector, {} fused",
            namespace,
            lexical_results.len(),
            vector_results.len(),
            fused.len()
        );

        let ids: Vec<i64> = fused.iter().map(|f| f.chunk_id).collect();
        let chunks = self.store.get(namespace, &ids).await?;
        let by_id: HashMap<i64, Chunk> = chunks.into_iter().map(|c| (c.id, c)).collect();

        Ok(fused
            .into_iter()
            .filter_map(|score| {
                by_id.get(&score.chunk_id).map(|chunk| SearchHit {
                    id: chunk.id,
                    text: chunk.text.clone(),
                    original_text: chunk.original_text.clone(),
                    source: chunk.source.clone(),
                    page: chunk.page,
                    heading: chunk.heading.clone(),
                    is_feedback: chunk.is_feedback,
                    extra_metadata: chunk.extra_metadata.clone(),
                    lexical_score: score.lexical,
                    vector_score: score.vector,
                    hybrid_score: score.combined,
                })
            })
            .collect())
    }

    /// Fallback retrieval path without lexical fusion.
    #[inline]
    pub async fn vector_search(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let entry = self.namespace_entry(namespace).await?;
        let index = entry.read().await;
        let results = index.vector.search(query_embedding, top_k)?;
        drop(index);

        let ids: Vec<i64> = results.iter().map(|(id, _)| *id).collect();
        let chunks = self.store.get(namespace, &ids).await?;
        let by_id: HashMap<i64, Chunk> = chunks.into_iter().map(|c| (c.id, c)).collect();

        Ok(results
            .into_iter()
            .filter_map(|(id, similarity)| {
                by_id.get(&id).map(|chunk| SearchHit {
                    id: chunk.id,
                    text: chunk.text.clone(),
                    original_text: chunk.original_text.clone(),
                    source: chunk.source.clone(),
                    page: chunk.page,
                    heading: chunk.heading.clone(),
                    is_feedback: chunk.is_feedback,
                    extra_metadata: chunk.extra_metadata.clone(),
                    lexical_score: 0.0,
                    vector_score: similarity,
                    hybrid_score: similarity,
                })
            })
            .collect())
    }

    /// Drop a namespace: its chunks, both indices, everything. Idempotent.
    #[inline]
    pub async fn delete_namespace(&self, namespace: &str) -> Result<DeleteReport> {
        let mut namespaces = self.namespaces.write().await;
        if let Some(entry) = namespaces.remove(namespace) {
            // Wait for in-flight readers and writers before the store delete.
            let _guard = entry.write().await;
        }
        let deleted_count = self.store.delete_namespace(namespace).await?;
        drop(namespaces);

        info!("Deleted namespace '{}' ({} chunks)", namespace, deleted_count);
        Ok(DeleteReport { deleted_count })
    }

    #[inline]
    pub async fn stats(&self, namespace: &str) -> Result<NamespaceStats> {
        self.store.stats(namespace).await
    }

    /// Fetch or lazily build the index pair for a namespace.
    async fn namespace_entry(&self, namespace: &str) -> Result<Arc<RwLock<NamespaceIndex>>> {
        {
            let namespaces = self.namespaces.read().await;
            if let Some(entry) = namespaces.get(namespace) {
                return Ok(Arc::clone(entry));
            }
        }

        let mut namespaces = self.namespaces.write().await;
        if let Some(entry) = namespaces.get(namespace) {
            return Ok(Arc::clone(entry));
        }

        let chunks = self.store.list(namespace).await?;
        let mut lexical = LexicalIndex::new(self.search.bm25.k1, self.search.bm25.b);
        lexical.rebuild(chunks.iter().map(|c| (c.id, c.text.as_str())));
        let mut vector = VectorIndex::new(self.store.metric());
        for chunk in &chunks {
            vector.add(chunk.id, chunk.embedding.clone())?;
        }

        debug!(
            "Bootstrapped indices for namespace '{}' from {} stored chunks",
            namespace,
            chunks.len()
        );
        let entry = Arc::new(RwLock::new(NamespaceIndex { lexical, vector }));
        namespaces.insert(namespace.to_string(), Arc::clone(&entry));
        Ok(entry)
    }
}
