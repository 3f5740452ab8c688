use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot insert an empty chunk batch")]
    EmptyBatch,

    #[error("Embedding count ({embeddings}) does not match metadata count ({metadatas})")]
    BatchLengthMismatch { embeddings: usize, metadatas: usize },

    #[error("Fusion weights must be non-negative: lexical={lexical}, vector={vector}")]
    InvalidWeight { lexical: f32, vector: f32 },

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RetrievalError {
    #[inline]
    fn from(err: sqlx::Error) -> Self {
        RetrievalError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RetrievalError {
    #[inline]
    fn from(err: serde_json::Error) -> Self {
        RetrievalError::Storage(err.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod engine;
pub mod search;
pub mod store;
