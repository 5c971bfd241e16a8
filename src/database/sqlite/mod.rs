use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::queries::FingerprintQueries;


pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// One row of the fingerprint store: the last successfully ingested state
/// of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub doc_id: String,
    pub path: String,
    pub content_sha: String,
    pub chunk_count: i64,
    pub ingested_at: String,
}

/// Persistent document-fingerprint store backed by SQLite.
///
/// Survives process restarts; the skip/proceed decision for re-ingestion is
/// made purely from the stored content hash.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_url: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_url)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_dir(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join("fingerprints.db");
        let db_url = db_path.to_string_lossy();

        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("Failed to create data directory: {}", data_dir.display())
        })?;

        Self::new(db_url.as_ref()).await
    }

    /// True when the document must be (re-)ingested: first sight of the
    /// identifier, or a content hash that differs from the stored one.
    #[inline]
    pub async fn should_reingest(&self, doc_id: &str, current_sha: &str) -> Result<bool> {
        match FingerprintQueries::get(&self.pool, doc_id).await? {
            Some(entry) => Ok(entry.content_sha != current_sha),
            None => Ok(true),
        }
    }

    /// Records a successful ingestion. Only called after the upsert for the
    /// document fully succeeded, so a failed run leaves the prior state and
    /// the document is retried next time.
    #[inline]
    pub async fn record_ingested(&self, entry: &FingerprintEntry) -> Result<()> {
        FingerprintQueries::upsert(&self.pool, entry).await
    }

    #[inline]
    pub async fn get_fingerprint(&self, doc_id: &str) -> Result<Option<FingerprintEntry>> {
        FingerprintQueries::get(&self.pool, doc_id).await
    }

    /// All known document identifiers, for reconciliation against the
    /// current input set.
    #[inline]
    pub async fn list_doc_ids(&self) -> Result<Vec<String>> {
        FingerprintQueries::list_doc_ids(&self.pool).await
    }

    #[inline]
    pub async fn remove_fingerprint(&self, doc_id: &str) -> Result<bool> {
        FingerprintQueries::remove(&self.pool, doc_id).await
    }

    #[inline]
    pub async fn count_fingerprints(&self) -> Result<i64> {
        FingerprintQueries::count(&self.pool).await
    }
}
