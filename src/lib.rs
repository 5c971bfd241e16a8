use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transient embedding provider error: {0}")]
    TransientProvider(String),

    #[error("Embedding provider rejected the request: {0}")]
    PermanentProvider(String),

    #[error("Embedding dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("Collection schema is incompatible: {0}")]
    SchemaIncompatible(String),

    #[error("Failed to parse document {path}: {reason}")]
    DocumentParse { path: PathBuf, reason: String },

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl IndexerError {
    /// True for failures that halt an entire ingestion run rather than a
    /// single document.
    #[inline]
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            IndexerError::StoreUnavailable(_) | IndexerError::SchemaIncompatible(_)
        )
    }
}

pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod indexer;
