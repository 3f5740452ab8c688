// Storage module
// Namespace-partitioned chunk persistence behind one trait with two
// interchangeable backends: a file-based in-process store and SQLite.

pub mod file;
pub mod models;
pub mod sqlite;

use crate::Result;
use crate::search::Metric;
use async_trait::async_trait;

pub use file::FileStore;
pub use models::{Chunk, ChunkMeta, DeleteReport, IngestReport, NamespaceStats, NewChunk};
pub use sqlite::SqliteStore;

/// Durable, namespace-partitioned storage of chunks and their embeddings.
///
/// Everything above this trait is backend-agnostic: the engine builds its
/// indices from `list` and never cares how chunks are persisted. Both
/// backends must satisfy this contract identically (the engine contract
/// tests run against each).
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Assign ids and persist a batch atomically. Fails with
    /// `DimensionMismatch` if any embedding disagrees with the namespace's
    /// established dimension, and `EmptyBatch` for a zero-length batch. On
    /// failure nothing is persisted.
    async fn insert(&self, namespace: &str, chunks: Vec<NewChunk>) -> Result<Vec<i64>>;

    /// All chunks of a namespace, ordered by ascending id. An unknown
    /// namespace yields an empty vector.
    async fn list(&self, namespace: &str) -> Result<Vec<Chunk>>;

    /// The chunks with the given ids, in ascending id order. Unknown ids are
    /// silently skipped.
    async fn get(&self, namespace: &str, ids: &[i64]) -> Result<Vec<Chunk>>;

    /// Remove every chunk of a namespace, returning how many were removed.
    /// Deleting an absent namespace is a no-op, not an error.
    async fn delete_namespace(&self, namespace: &str) -> Result<u64>;

    /// Aggregate counts for a namespace.
    async fn stats(&self, namespace: &str) -> Result<NamespaceStats>;

    /// The distance metric the engine's vector index should use for chunks
    /// from this backend.
    fn metric(&self) -> Metric;
}

/// Runtime-selected backend, so command code does not have to be generic.
pub enum AnyStore {
    File(FileStore),
    Sqlite(SqliteStore),
}

#[async_trait]
impl ChunkStore for AnyStore {
    #[inline]
    async fn insert(&self, namespace: &str, chunks: Vec<NewChunk>) -> Result<Vec<i64>> {
        match self {
            AnyStore::File(store) => store.insert(namespace, chunks).await,
            AnyStore::Sqlite(store) => store.insert(namespace, chunks).await,
        }
    }

    #[inline]
    async fn list(&self, namespace: &str) -> Result<Vec<Chunk>> {
        match self {
            AnyStore::File(store) => store.list(namespace).await,
            AnyStore::Sqlite(store) => store.list(namespace).await,
        }
    }

    #[inline]
    async fn get(&self, namespace: &str, ids: &[i64]) -> Result<Vec<Chunk>> {
        match self {
            AnyStore::File(store) => store.get(namespace, ids).await,
            AnyStore::Sqlite(store) => store.get(namespace, ids).await,
        }
    }

    #[inline]
    async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        match self {
            AnyStore::File(store) => store.delete_namespace(namespace).await,
            AnyStore::Sqlite(store) => store.delete_namespace(namespace).await,
        }
    }

    #[inline]
    async fn stats(&self, namespace: &str) -> Result<NamespaceStats> {
        match self {
            AnyStore::File(store) => store.stats(namespace).await,
            AnyStore::Sqlite(store) => store.stats(namespace).await,
        }
    }

    #[inline]
    fn metric(&self) -> Metric {
        match self {
            AnyStore::File(store) => store.metric(),
            AnyStore::Sqlite(store) => store.metric(),
        }
    }
}
