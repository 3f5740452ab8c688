
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Which chunk store backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// JSON files under the data directory, loaded into memory per process.
    #[default]
    File,
    /// SQLite database with embeddings in a vector-typed (blob) column.
    Sqlite,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Default weight of the keyword channel in hybrid fusion. Carried over
    /// from operational experience, not asserted optimal; tune per corpus.
    pub lexical_weight: f32,
    /// Default weight of the vector channel in hybrid fusion.
    pub vector_weight: f32,
    pub bm25: Bm25Config,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Bm25Config {
    pub k1: f32,
    pub b: f32,
}

impl Default for SearchConfig {
    #[inline]
    fn default() -> Self {
        Self {
            lexical_weight: 0.3,
            vector_weight: 0.7,
            bm25: Bm25Config::default(),
        }
    }
}

impl Default for Bm25Config {
    #[inline]
    fn default() -> Self {
        Self {
            k1: crate::search::lexical::DEFAULT_K1,
            b: crate::search::lexical::DEFAULT_B,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid fusion weight: {0} (must be non-negative)")]
    InvalidWeight(f32),
    #[error("Invalid BM25 k1: {0} (must be positive)")]
    InvalidK1(f32),
    #[error("Invalid BM25 b: {0} (must be between 0 and 1)")]
    InvalidB(f32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                backend: BackendKind::default(),
                search: SearchConfig::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.lexical_weight < 0.0 || !self.search.lexical_weight.is_finite() {
            return Err(ConfigError::InvalidWeight(self.search.lexical_weight));
        }
        if self.search.vector_weight < 0.0 || !self.search.vector_weight.is_finite() {
            return Err(ConfigError::InvalidWeight(self.search.vector_weight));
        }
        if self.search.bm25.k1 <= 0.0 || !self.search.bm25.k1.is_finite() {
            return Err(ConfigError::InvalidK1(self.search.bm25.k1));
        }
        if !(0.0..=1.0).contains(&self.search.bm25.b) {
            return Err(ConfigError::InvalidB(self.search.bm25.b));
        }
        Ok(())
    }

    /// Path of the SQLite database for the `sqlite` backend.
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.base_dir.join("chunks.db")
    }

    /// Root directory of the per-namespace files for the `file` backend.
    #[inline]
    pub fn namespaces_path(&self) -> PathBuf {
        self.base_dir.join("namespaces")
    }
}
