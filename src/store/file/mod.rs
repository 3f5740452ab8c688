#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::search::Metric;
use crate::store::models::{Chunk, NamespaceStats, NewChunk};
use crate::{Result, RetrievalError};

/// In-process chunk store persisted as one JSON file per namespace.
///
/// Every namespace file is loaded into memory at construction; writes replace
/// the whole file through a temp-file rename so a failed write never leaves a
/// partially persisted batch behind.
pub struct FileStore {
    root: PathBuf,
    namespaces: RwLock<HashMap<String, NamespaceFile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamespaceFile {
    namespace: String,
    dimension: Option<usize>,
    next_id: i64,
    chunks: Vec<Chunk>,
}

impl NamespaceFile {
    fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            dimension: None,
            next_id: 1,
            chunks: Vec::new(),
        }
    }
}

impl FileStore {
    /// Open a store rooted at `root`, loading any namespace files already
    /// present on disk.
    #[inline]
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        let mut namespaces = HashMap::new();
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<NamespaceFile>(&content) {
                Ok(file) => {
                    debug!(
                        "Loaded namespace '{}' ({} chunks) from {}",
                        file.namespace,
                        file.chunks.len(),
                        path.display()
                    );
                    namespaces.insert(file.namespace.clone(), file);
                }
                Err(e) => {
                    // A corrupt namespace file must not silently shrink the
                    // corpus; refuse to start instead of best-effort loading.
                    warn!("Failed to parse namespace file {}: {}", path.display(), e);
                    return Err(RetrievalError::Storage(format!(
                        "Corrupt namespace file {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        info!(
            "File store opened at {} with {} namespaces",
            root.display(),
            namespaces.len()
        );
        Ok(Self {
            root,
            namespaces: RwLock::new(namespaces),
        })
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        use std::fmt::Write as _;

        // Filesystem-safe, collision-free encoding of the opaque namespace id.
        let mut encoded = String::with_capacity(namespace.len());
        for byte in namespace.bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => {
                    encoded.push(byte as char);
                }
                _ => {
                    // Writing to a String cannot fail.
                    let _ = write!(encoded, "%{:02x}", byte);
                }
            }
        }
        self.root.join(format!("{}.json", encoded))
    }

    async fn persist(&self, file: &NamespaceFile) -> Result<()> {
        let path = self.namespace_path(&file.namespace);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string(file)?;
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    #[inline]
    pub async fn insert(&self, namespace: &str, chunks: Vec<NewChunk>) -> Result<Vec<i64>> {
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyBatch);
        }

        let mut namespaces = self.namespaces.write().await;
        let current = namespaces
            .get(namespace)
            .cloned()
            .unwrap_or_else(|| NamespaceFile::new(namespace));

        // Dimension is fixed by the namespace's first chunk.
        let expected = current
            .dimension
            .unwrap_or_else(|| chunks[0].embedding.len());
        for chunk in &chunks {
            if chunk.embedding.len() != expected {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: chunk.embedding.len(),
                });
            }
        }

        let mut updated = current;
        updated.dimension = Some(expected);
        let now = Utc::now().naive_utc();
        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let id = updated.next_id;
            updated.next_id += 1;
            ids.push(id);
            updated.chunks.push(Chunk {
                id,
                namespace: namespace.to_string(),
                text: chunk.text,
                original_text: chunk.original_text,
                embedding: chunk.embedding,
                source: chunk.source,
                page: chunk.page,
                heading: chunk.heading,
                section_type: chunk.section_type,
                is_feedback: chunk.is_feedback,
                extra_metadata: chunk.extra_metadata,
                created_date: now,
            });
        }

        // Persist before publishing to memory so a failed write leaves the
        // in-memory state untouched.
        self.persist(&updated).await?;
        namespaces.insert(namespace.to_string(), updated);

        debug!("Inserted {} chunks into namespace '{}'", ids.len(), namespace);
        Ok(ids)
    }

    #[inline]
    pub async fn list(&self, namespace: &str) -> Result<Vec<Chunk>> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .map(|file| file.chunks.clone())
            .unwrap_or_default())
    }

    #[inline]
    pub async fn get(&self, namespace: &str, ids: &[i64]) -> Result<Vec<Chunk>> {
        let wanted: std::collections::HashSet<i64> = ids.iter().copied().collect();
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .map(|file| {
                file.chunks
                    .iter()
                    .filter(|chunk| wanted.contains(&chunk.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    #[inline]
    pub async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        let mut namespaces = self.namespaces.write().await;
        let Some(file) = namespaces.remove(namespace) else {
            return Ok(0);
        };

        let path = self.namespace_path(namespace);
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                // Keep memory and disk consistent if the unlink failed.
                namespaces.insert(namespace.to_string(), file);
                return Err(e.into());
            }
        }

        info!(
            "Deleted namespace '{}' ({} chunks)",
            namespace,
            file.chunks.len()
        );
        Ok(file.chunks.len() as u64)
    }

    #[inline]
    pub async fn stats(&self, namespace: &str) -> Result<NamespaceStats> {
        let namespaces = self.namespaces.read().await;
        let Some(file) = namespaces.get(namespace) else {
            return Ok(NamespaceStats::empty());
        };

        let feedback_chunks = file.chunks.iter().filter(|c| c.is_feedback).count() as i64;
        let unique_sources = file
            .chunks
            .iter()
            .filter_map(|c| c.source.as_deref())
            .unique()
            .count() as i64;

        Ok(NamespaceStats {
            total_chunks: file.chunks.len() as i64,
            feedback_chunks,
            unique_sources,
            dimension: file.dimension,
        })
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        Metric::SquaredEuclidean
    }
}

#[async_trait::async_trait]
impl crate::store::ChunkStore for FileStore {
    #[inline]
    async fn insert(&self, namespace: &str, chunks: Vec<NewChunk>) -> Result<Vec<i64>> {
        FileStore::insert(self, namespace, chunks).await
    }

    #[inline]
    async fn list(&self, namespace: &str) -> Result<Vec<Chunk>> {
        FileStore::list(self, namespace).await
    }

    #[inline]
    async fn get(&self, namespace: &str, ids: &[i64]) -> Result<Vec<Chunk>> {
        FileStore::get(self, namespace, ids).await
    }

    #[inline]
    async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        FileStore::delete_namespace(self, namespace).await
    }

    #[inline]
    async fn stats(&self, namespace: &str) -> Result<NamespaceStats> {
        FileStore::stats(self, namespace).await
    }

    #[inline]
    fn metric(&self) -> Metric {
        FileStore::metric(self)
    }
}
