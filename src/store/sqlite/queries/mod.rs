#[cfg(test)]
mod tests;

use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::store::models::{Chunk, NamespaceStats, NewChunk};
use crate::{Result, RetrievalError};

pub struct ChunkQueries;

impl ChunkQueries {
    /// Insert a batch inside one transaction, assigning ids from the
    /// namespace's persistent counter so ids are never reused.
    #[inline]
    pub async fn insert_batch(
        pool: &SqlitePool,
        namespace: &str,
        chunks: Vec<NewChunk>,
    ) -> Result<Vec<i64>> {
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyBatch);
        }

        let mut tx = pool.begin().await?;

        let existing: Option<(i64, i64)> =
            sqlx::query_as("SELECT dimension, next_id FROM namespaces WHERE namespace = ?")
                .bind(namespace)
                .fetch_optional(&mut *tx)
                .await?;

        let (expected, mut next_id) = match existing {
            Some((dimension, next_id)) => (dimension as usize, next_id),
            None => (chunks[0].embedding.len(), 1),
        };

        for chunk in &chunks {
            if chunk.embedding.len() != expected {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: chunk.embedding.len(),
                });
            }
        }

        if existing.is_none() {
            sqlx::query("INSERT INTO namespaces (namespace, dimension, next_id) VALUES (?, ?, 1)")
                .bind(namespace)
                .bind(expected as i64)
                .execute(&mut *tx)
                .await?;
        }

        let now = Utc::now().naive_utc();
        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let id = next_id;
            next_id += 1;
            ids.push(id);

            sqlx::query(
                r#"
                INSERT INTO chunks
                    (namespace, chunk_id, text, original_text, embedding, source,
                     page, heading, section_type, is_feedback, extra_metadata, created_date)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(namespace)
            .bind(id)
            .bind(&chunk.text)
            .bind(&chunk.original_text)
            .bind(encode_embedding(&chunk.embedding))
            .bind(&chunk.source)
            .bind(chunk.page)
            .bind(&chunk.heading)
            .bind(&chunk.section_type)
            .bind(chunk.is_feedback)
            .bind(serde_json::to_string(&chunk.extra_metadata)?)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE namespaces SET next_id = ? WHERE namespace = ?")
            .bind(next_id)
            .bind(namespace)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Inserted {} chunks into namespace '{}'", ids.len(), namespace);
        Ok(ids)
    }

    #[inline]
    pub async fn list(pool: &SqlitePool, namespace: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            r#"
            SELECT namespace, chunk_id, text, original_text, embedding, source,
                   page, heading, section_type, is_feedback, extra_metadata, created_date
            FROM chunks
            WHERE namespace = ?
            ORDER BY chunk_id ASC
            "#,
        )
        .bind(namespace)
        .fetch_all(pool)
        .await?;

        rows.iter().map(chunk_from_row).collect()
    }

    #[inline]
    pub async fn get(pool: &SqlitePool, namespace: &str, ids: &[i64]) -> Result<Vec<Chunk>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = sqlx::QueryBuilder::new(
            r#"
            SELECT namespace, chunk_id, text, original_text, embedding, source,
                   page, heading, section_type, is_feedback, extra_metadata, created_date
            FROM chunks
            WHERE namespace = "#,
        );
        builder.push_bind(namespace);
        builder.push(" AND chunk_id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY chunk_id ASC");

        let rows = builder.build().fetch_all(pool).await?;
        rows.iter().map(chunk_from_row).collect()
    }

    #[inline]
    pub async fn delete_namespace(pool: &SqlitePool, namespace: &str) -> Result<u64> {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM chunks WHERE namespace = ?")
            .bind(namespace)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM namespaces WHERE namespace = ?")
            .bind(namespace)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }

    #[inline]
    pub async fn stats(pool: &SqlitePool, namespace: &str) -> Result<NamespaceStats> {
        let dimension: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM namespaces WHERE namespace = ?")
                .bind(namespace)
                .fetch_optional(pool)
                .await?;

        let total_chunks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE namespace = ?")
                .bind(namespace)
                .fetch_one(pool)
                .await?;

        let feedback_chunks: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chunks WHERE namespace = ? AND is_feedback = 1",
        )
        .bind(namespace)
        .fetch_one(pool)
        .await?;

        let unique_sources: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT source) FROM chunks WHERE namespace = ? AND source IS NOT NULL",
        )
        .bind(namespace)
        .fetch_one(pool)
        .await?;

        Ok(NamespaceStats {
            total_chunks,
            feedback_chunks,
            unique_sources,
            dimension: dimension.map(|d| d as usize),
        })
    }
}

fn chunk_from_row(row: &SqliteRow) -> Result<Chunk> {
    let embedding_bytes: Vec<u8> = row.try_get("embedding")?;
    let extra_metadata: String = row.try_get("extra_metadata")?;
    Ok(Chunk {
        id: row.try_get("chunk_id")?,
        namespace: row.try_get("namespace")?,
        text: row.try_get("text")?,
        original_text: row.try_get("original_text")?,
        embedding: decode_embedding(&embedding_bytes)?,
        source: row.try_get("source")?,
        page: row.try_get("page")?,
        heading: row.try_get("heading")?,
        section_type: row.try_get("section_type")?,
        is_feedback: row.try_get("is_feedback")?,
        extra_metadata: serde_json::from_str(&extra_metadata)?,
        created_date: row.try_get::<NaiveDateTime, _>("created_date")?,
    })
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(RetrievalError::Storage(format!(
            "Embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
