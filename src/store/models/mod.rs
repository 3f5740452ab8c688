
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One retrievable unit of text with its embedding and provenance.
///
/// Chunks are immutable once created: they are only ever inserted as part of
/// an ingestion batch and destroyed by namespace deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique within a namespace, assigned by the store, monotonically increasing.
    pub id: i64,
    pub namespace: String,
    /// The text that is indexed and matched against queries.
    pub text: String,
    /// The text to display to a user (may predate OCR cleanup).
    pub original_text: String,
    pub embedding: Vec<f32>,
    pub source: Option<String>,
    pub page: Option<i64>,
    pub heading: Option<String>,
    pub section_type: Option<String>,
    pub is_feedback: bool,
    /// Open key/value map, forwarded unmodified. The engine never interprets it.
    #[serde(default)]
    pub extra_metadata: Map<String, Value>,
    pub created_date: NaiveDateTime,
}

/// A chunk as handed to the store, before an id has been assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChunk {
    pub text: String,
    pub original_text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub section_type: Option<String>,
    #[serde(default)]
    pub is_feedback: bool,
    #[serde(default)]
    pub extra_metadata: Map<String, Value>,
}

/// Chunk metadata as supplied by the chunking/extraction collaborator,
/// before it has been paired with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub text: String,
    pub original_text: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub section_type: Option<String>,
    #[serde(default)]
    pub is_feedback: bool,
    #[serde(default)]
    pub extra_metadata: Map<String, Value>,
}

impl ChunkMeta {
    /// Pair this metadata with its embedding to form an insertable chunk.
    #[inline]
    pub fn with_embedding(self, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            text: self.text,
            original_text: self.original_text,
            embedding,
            source: self.source,
            page: self.page,
            heading: self.heading,
            section_type: self.section_type,
            is_feedback: self.is_feedback,
            extra_metadata: self.extra_metadata,
        }
    }
}

impl NewChunk {
    /// Split into the embedding and the remaining metadata, the shape the
    /// engine's ingestion entry point takes its input in.
    #[inline]
    pub fn into_parts(self) -> (Vec<f32>, ChunkMeta) {
        (
            self.embedding,
            ChunkMeta {
                text: self.text,
                original_text: self.original_text,
                source: self.source,
                page: self.page,
                heading: self.heading,
                section_type: self.section_type,
                is_feedback: self.is_feedback,
                extra_metadata: self.extra_metadata,
            },
        )
    }

    /// Build the synthetic chunk the feedback loop feeds into ingestion.
    #[inline]
    pub fn feedback(question: &str, corrected_answer: &str, embedding: Vec<f32>) -> Self {
        let text = format!("Q: {}\nA: {}", question, corrected_answer);
        Self {
            text: text.clone(),
            original_text: text,
            embedding,
            source: Some("instructor_feedback".to_string()),
            page: None,
            heading: None,
            section_type: None,
            is_feedback: true,
            extra_metadata: Map::new(),
        }
    }
}

/// Aggregate counts for one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub total_chunks: i64,
    pub feedback_chunks: i64,
    pub unique_sources: i64,
    /// `None` until the namespace's first chunk has been inserted.
    pub dimension: Option<usize>,
}

impl NamespaceStats {
    #[inline]
    pub fn empty() -> Self {
        Self {
            total_chunks: 0,
            feedback_chunks: 0,
            unique_sources: 0,
            dimension: None,
        }
    }
}

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub added: usize,
    pub total_docs: usize,
}

/// Outcome of a namespace deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted_count: u64,
}
