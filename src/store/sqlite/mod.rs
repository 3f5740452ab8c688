
pub mod queries;

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use crate::search::Metric;
use crate::store::models::{Chunk, NamespaceStats, NewChunk};
use crate::{Result, RetrievalError};
use queries::ChunkQueries;

pub type DbPool = Pool<Sqlite>;

/// Database-backed chunk store: one relational table of chunk rows with the
/// embedding persisted as a little-endian f32 blob.
///
/// All multi-row writes run inside a transaction, so a storage failure during
/// ingestion rolls back fully and never leaves a partial chunk set behind.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Failed to open database: {}", e)))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<()> {
        info!("Running chunk store migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS namespaces (
                namespace TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                next_id INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                namespace TEXT NOT NULL REFERENCES namespaces(namespace) ON DELETE CASCADE,
                chunk_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                original_text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                source TEXT,
                page INTEGER,
                heading TEXT,
                section_type TEXT,
                is_feedback INTEGER NOT NULL DEFAULT 0,
                extra_metadata TEXT NOT NULL DEFAULT '{}',
                created_date TEXT NOT NULL,
                PRIMARY KEY (namespace, chunk_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_namespace ON chunks(namespace)")
            .execute(&self.pool)
            .await?;

        debug!("Chunk store migrations completed");
        Ok(())
    }

    #[inline]
    pub async fn insert(&self, namespace: &str, chunks: Vec<NewChunk>) -> Result<Vec<i64>> {
        ChunkQueries::insert_batch(&self.pool, namespace, chunks).await
    }

    #[inline]
    pub async fn list(&self, namespace: &str) -> Result<Vec<Chunk>> {
        ChunkQueries::list(&self.pool, namespace).await
    }

    #[inline]
    pub async fn get(&self, namespace: &str, ids: &[i64]) -> Result<Vec<Chunk>> {
        ChunkQueries::get(&self.pool, namespace, ids).await
    }

    #[inline]
    pub async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        ChunkQueries::delete_namespace(&self.pool, namespace).await
    }

    #[inline]
    pub async fn stats(&self, namespace: &str) -> Result<NamespaceStats> {
        ChunkQueries::stats(&self.pool, namespace).await
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        Metric::Cosine
    }
}

#[async_trait::async_trait]
impl crate::store::ChunkStore for SqliteStore {
    #[inline]
    async fn insert(&self, namespace: &str, chunks: Vec<NewChunk>) -> Result<Vec<i64>> {
        SqliteStore::insert(self, namespace, chunks).await
    }

    #[inline]
    async fn list(&self, namespace: &str) -> Result<Vec<Chunk>> {
        SqliteStore::list(self, namespace).await
    }

    #[inline]
    async fn get(&self, namespace: &str, ids: &[i64]) -> Result<Vec<Chunk>> {
        SqliteStore::get(self, namespace, ids).await
    }

    #[inline]
    async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        SqliteStore::delete_namespace(self, namespace).await
    }

    #[inline]
    async fn stats(&self, namespace: &str) -> Result<NamespaceStats> {
        SqliteStore::stats(self, namespace).await
    }

    #[inline]
    fn metric(&self) -> Metric {
        SqliteStore::metric(self)
    }
}
