// Indexer module
// Orchestrates the per-document pipeline: fingerprint check, chunking,
// batched embedding, upsert, tombstoning, and fingerprint commit


use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::{Config, DistanceKind};
use crate::database::{
    CollectionOutcome, CollectionSpec, Database, FingerprintEntry, PointRecord, QdrantStore,
    VectorIndex,
};
use crate::document::{Document, DocumentOverrides, collect_files, stable_uuid};
use crate::embeddings::{ChunkingConfig, EmbeddingProvider, chunk_text, create_provider, vector_name};
use crate::{IndexerError, Result};

/// Options for one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Re-ingest every document regardless of its stored fingerprint.
    pub force: bool,
    /// Reconcile the fingerprint store against the current input set,
    /// tombstoning points of documents that no longer exist.
    pub prune: bool,
    pub overrides: DocumentOverrides,
}

/// Per-document failure detail surfaced in the run report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct IngestFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome summary of an ingestion run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub chunks_upserted: usize,
    pub pruned: usize,
    pub failures: Vec<IngestFailure>,
    /// Set when a run-level failure stopped processing early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
}

enum DocOutcome {
    Processed { chunks: usize },
    Skipped,
}

/// Ingestion orchestrator.
///
/// Owns the fingerprint store, the vector index, and the embedding
/// provider; all three are passed-in dependencies so the pipeline can be
/// exercised against fakes.
pub struct Indexer {
    database: Database,
    store: Arc<dyn VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    collection: String,
    distance: DistanceKind,
    concurrency: usize,
    embed_limit: Arc<Semaphore>,
}

impl Indexer {
    /// Builds an indexer with real components from configuration.
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let data_dir = config
            .data_dir()
            .map_err(|e| IndexerError::Config(e.to_string()))?;
        let database = Database::initialize_from_dir(&data_dir)
            .await
            .map_err(|e| IndexerError::Database(e.to_string()))?;

        let store = Arc::new(QdrantStore::new(&config.qdrant)?);
        let provider: Arc<dyn EmbeddingProvider> =
            Arc::from(create_provider(&config.embedding)?);

        Ok(Self::with_components(
            database,
            store,
            provider,
            config.chunking,
            &config.qdrant.collection,
            config.qdrant.distance,
            config.indexer.concurrency,
        ))
    }

    /// Wires the orchestrator from explicit components.
    #[inline]
    pub fn with_components(
        database: Database,
        store: Arc<dyn VectorIndex>,
        provider: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
        collection: &str,
        distance: DistanceKind,
        concurrency: usize,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            database,
            store,
            provider,
            chunking,
            collection: collection.to_string(),
            distance,
            concurrency,
            embed_limit: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// The collection schema implied by the configured provider.
    #[inline]
    pub fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.collection.clone(),
            vector_name: vector_name(self.provider.model_id()),
            dimension: self.provider.dimension(),
            distance: self.distance,
        }
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Runs the full ingestion pipeline over the given inputs.
    ///
    /// Documents are processed concurrently; each document either commits
    /// fully (points upserted, stale points tombstoned, fingerprint
    /// recorded) or fails without advancing its fingerprint. Store
    /// unavailability and schema incompatibility halt the run; every other
    /// failure is isolated to its document.
    #[inline]
    pub async fn ingest(
        &self,
        inputs: &[PathBuf],
        recursive: bool,
        extensions: &[String],
        options: &IngestOptions,
    ) -> Result<IngestReport> {
        // Fail fast before touching any document when the store is down or
        // the schema cannot be used.
        self.store.healthy().await?;
        let spec = self.collection_spec();
        match self.store.ensure_collection(&spec).await? {
            CollectionOutcome::Incompatible(reason) => {
                return Err(IndexerError::SchemaIncompatible(reason));
            }
            CollectionOutcome::Created => {
                info!("Created collection '{}'", spec.name);
            }
            CollectionOutcome::Ready => {}
        }

        let files = collect_files(inputs, recursive, extensions);
        info!("Collected {} candidate files", files.len());

        let mut report = IngestReport::default();

        // Load documents up front and deduplicate by identity so no two
        // workers ever touch the same document in one run.
        let mut documents: Vec<Document> = Vec::with_capacity(files.len());
        let mut seen_ids: HashSet<String> = HashSet::new();
        for path in &files {
            match Document::load(path, &options.overrides) {
                Ok(doc) => {
                    if seen_ids.insert(doc.doc_id.clone()) {
                        documents.push(doc);
                    } else {
                        warn!("Duplicate document identity, skipping: {}", path.display());
                    }
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", path.display(), e);
                    report.failed += 1;
                    report.failures.push(IngestFailure {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let current_ids: HashSet<String> =
            documents.iter().map(|d| d.doc_id.clone()).collect();

        let progress = ProgressBar::new(documents.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
            )
            .expect("progress template is valid")
            .progress_chars("##-"),
        );

        let halt: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let outcomes: Vec<(String, std::result::Result<DocOutcome, String>)> =
            stream::iter(documents.iter())
                .map(|doc| {
                    let progress = progress.clone();
                    let halt = Arc::clone(&halt);
                    async move {
                        let path = doc.path.display().to_string();
                        let halted_reason = {
                            let guard = halt.lock().expect("halt lock is not poisoned");
                            guard.clone()
                        };
                        let result = if let Some(reason) = halted_reason {
                            Err(format!("run halted: {reason}"))
                        } else {
                            match self.process_document(doc, options).await {
                                Ok(outcome) => Ok(outcome),
                                Err(e) => {
                                    if e.is_run_fatal() {
                                        let mut guard =
                                            halt.lock().expect("halt lock is not poisoned");
                                        guard.get_or_insert_with(|| e.to_string());
                                    }
                                    Err(e.to_string())
                                }
                            }
                        };
                        progress.inc(1);
                        (path, result)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        progress.finish_and_clear();

        for (path, outcome) in outcomes {
            match outcome {
                Ok(DocOutcome::Processed { chunks }) => {
                    report.processed += 1;
                    report.chunks_upserted += chunks;
                }
                Ok(DocOutcome::Skipped) => report.skipped += 1,
                Err(reason) => {
                    error!("Failed to ingest {}: {}", path, reason);
                    report.failed += 1;
                    report.failures.push(IngestFailure { path, reason });
                }
            }
        }
        report.failures.sort();

        let halted = {
            let guard = halt.lock().expect("halt lock is not poisoned");
            guard.clone()
        };
        report.halted = halted;

        if options.prune && report.halted.is_none() {
            self.prune_vanished(&current_ids, &mut report).await?;
        }

        info!(
            "Ingestion run complete: {} processed, {} skipped, {} failed",
            report.processed, report.skipped, report.failed
        );

        Ok(report)
    }

    /// Runs the pipeline for one document.
    ///
    /// Stage order matters: the fingerprint is only recorded after the
    /// upsert and tombstone pass succeeded, so any earlier failure leaves
    /// the document due for retry on the next run.
    async fn process_document(
        &self,
        doc: &Document,
        options: &IngestOptions,
    ) -> Result<DocOutcome> {
        if !options.force {
            let reingest = self
                .database
                .should_reingest(&doc.doc_id, &doc.content_sha)
                .await
                .map_err(|e| IndexerError::Database(e.to_string()))?;
            if !reingest {
                debug!(
                    "Skipping unchanged document {} (sha={})",
                    doc.path.display(),
                    &doc.content_sha[..8.min(doc.content_sha.len())]
                );
                return Ok(DocOutcome::Skipped);
            }
        }

        let chunks = chunk_text(&doc.body, &self.chunking);
        debug!(
            "Document {} produced {} chunks",
            doc.path.display(),
            chunks.len()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_all(&texts).await?;

        let ingested_at = now_iso();
        let vname = vector_name(self.provider.model_id());

        let mut points = Vec::with_capacity(chunks.len());
        let mut new_ids = HashSet::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let id = stable_uuid(&format!("{}:{}", doc.doc_id, chunk.index)).to_string();
            new_ids.insert(id.clone());
            points.push(PointRecord {
                id,
                vector_name: vname.clone(),
                vector,
                payload: serde_json::json!({
                    "document": chunk.text,
                    "type": doc.metadata.doc_type,
                    "category": doc.metadata.category,
                    "title": doc.metadata.title,
                    "path": doc.path.display().to_string(),
                    "doc_id": doc.doc_id,
                    "doc_version": doc.content_sha,
                    "chunk_idx": chunk.index,
                    "chunk_chars": chunk.char_len(),
                    "people": doc.metadata.people,
                    "tags": doc.metadata.tags,
                    "is_active": true,
                    "ingested_at": ingested_at,
                    "source_mtime": doc.source_mtime,
                    "content_sha": doc.content_sha,
                }),
            });
        }

        // Deterministic ids make the upsert overwrite matching points;
        // whatever remains active from a previous version is tombstoned,
        // never deleted.
        let existing = self.store.active_point_ids(&doc.doc_id).await?;
        let chunk_count = points.len();
        self.store.upsert(points).await?;

        let stale: Vec<String> = existing
            .into_iter()
            .filter(|id| !new_ids.contains(id))
            .collect();
        if !stale.is_empty() {
            info!(
                "Tombstoning {} stale points for {}",
                stale.len(),
                doc.path.display()
            );
            self.store.tombstone(stale, &ingested_at).await?;
        }

        self.database
            .record_ingested(&FingerprintEntry {
                doc_id: doc.doc_id.clone(),
                path: doc.path.display().to_string(),
                content_sha: doc.content_sha.clone(),
                chunk_count: chunk_count as i64,
                ingested_at,
            })
            .await
            .map_err(|e| IndexerError::Database(e.to_string()))?;

        Ok(DocOutcome::Processed {
            chunks: chunk_count,
        })
    }

    /// Embeds all chunk texts of one document, batch by batch.
    ///
    /// Batches for a single document run sequentially; the semaphore bounds
    /// how many provider requests are in flight across documents.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = self.provider.max_batch_size().max(1);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            let permit = self
                .embed_limit
                .acquire()
                .await
                .map_err(|e| IndexerError::Other(anyhow::anyhow!("semaphore closed: {e}")))?;

            let provider = Arc::clone(&self.provider);
            let owned: Vec<String> = batch.to_vec();
            let result = tokio::task::spawn_blocking(move || provider.embed_batch(&owned))
                .await
                .map_err(|e| {
                    IndexerError::Other(anyhow::anyhow!("embedding task panicked: {e}"))
                })?;
            drop(permit);

            vectors.extend(result?);
        }

        Ok(vectors)
    }

    /// Reconciliation pass: documents known to the fingerprint store but
    /// absent from the current input set get their active points
    /// tombstoned and their fingerprint removed, so a restored file
    /// re-ingests cleanly.
    async fn prune_vanished(
        &self,
        current_ids: &HashSet<String>,
        report: &mut IngestReport,
    ) -> Result<()> {
        let known = self
            .database
            .list_doc_ids()
            .await
            .map_err(|e| IndexerError::Database(e.to_string()))?;

        for doc_id in known {
            if current_ids.contains(&doc_id) {
                continue;
            }

            let active = self.store.active_point_ids(&doc_id).await?;
            if !active.is_empty() {
                info!(
                    "Pruning vanished document {} ({} active points)",
                    doc_id,
                    active.len()
                );
                self.store.tombstone(active, &now_iso()).await?;
            }
            self.database
                .remove_fingerprint(&doc_id)
                .await
                .map_err(|e| IndexerError::Database(e.to_string()))?;
            report.pruned += 1;
        }

        Ok(())
    }
}

/// UTC timestamp in RFC 3339 with second precision.
#[inline]
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
