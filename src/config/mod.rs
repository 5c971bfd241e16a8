// Configuration management module
// Handles TOML configuration for the embedding provider, Qdrant, and chunking

pub mod settings;

pub use settings::{
    Config, ConfigError, DistanceKind, EmbeddingConfig, IndexerConfig, ProviderKind, QdrantConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
