use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    /// Overrides the data directory; used by tests, never serialized.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub model: String,
    /// Output dimensionality of the configured model. The collection schema
    /// is created from this value, so it must match what the provider
    /// actually returns.
    pub dimension: usize,
    pub batch_size: u32,
    /// Overrides the provider's default endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// API key for hosted providers; falls back to the provider's
    /// conventional environment variable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceKind {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QdrantConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub collection: String,
    #[serde(default)]
    pub distance: DistanceKind,
    pub upsert_batch: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexerConfig {
    /// Maximum number of documents processed concurrently.
    pub concurrency: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 1 and 65536)")]
    InvalidDimension(usize),
    #[error("Invalid collection name: {0} (cannot be empty)")]
    InvalidCollection(String),
    #[error("Invalid chunking settings: {0}")]
    InvalidChunking(String),
    #[error("Invalid concurrency: {0} (must be between 1 and 64)")]
    InvalidConcurrency(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            model: "nomic-embed-text:latest".to_string(),
            dimension: 768,
            batch_size: 32,
            endpoint: None,
            api_key: None,
        }
    }
}

impl Default for QdrantConfig {
    #[inline]
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "personal_assistant".to_string(),
            distance: DistanceKind::Cosine,
            upsert_batch: 64,
        }
    }
}

impl Default for IndexerConfig {
    #[inline]
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".vault-indexer"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("vault-indexer"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Data directory holding the fingerprint database. Defaults to the
    /// config directory unless `base_dir` overrides it.
    #[inline]
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::config_dir(),
        }
    }

    #[inline]
    pub fn fingerprint_db_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("fingerprints.db"))
    }

    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = Self::config_dir().context("Failed to determine config directory")?;

        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.qdrant.validate()?;
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::InvalidChunking(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.indexer.concurrency == 0 || self.indexer.concurrency > 64 {
            return Err(ConfigError::InvalidConcurrency(self.indexer.concurrency));
        }
        Ok(())
    }
}

impl EmbeddingConfig {
    /// Base endpoint for the configured provider.
    #[inline]
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let default = match self.provider {
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        };
        let url_str = self.endpoint.as_deref().unwrap_or(default);
        Url::parse(url_str).map_err(|_| ConfigError::InvalidUrl(url_str.to_string()))
    }

    /// API key from config, falling back to the provider's conventional
    /// environment variable.
    #[inline]
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            return Some(key.clone());
        }
        let var = match self.provider {
            ProviderKind::Ollama => return None,
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        };
        std::env::var(var).ok()
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if self.dimension == 0 || self.dimension > 65536 {
            return Err(ConfigError::InvalidDimension(self.dimension));
        }

        self.endpoint_url()?;

        Ok(())
    }
}

impl QdrantConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }

        Url::parse(&self.url).map_err(|_| ConfigError::InvalidUrl(self.url.clone()))?;

        Ok(())
    }
}
