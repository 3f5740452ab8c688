// Configuration management module
// TOML-backed settings: backend selection, fusion weights, BM25 constants.

pub mod settings;


pub use settings::{BackendKind, Bm25Config, Config, ConfigError, SearchConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("coursefind"))
        .ok_or(ConfigError::DirectoryError)
}
