use anyhow::{Context, Result, bail};
use itertools::Itertools;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{Config, ProviderKind};
use crate::database::{CollectionSpec, Database, QdrantStore, VectorIndex};
use crate::document::DocumentOverrides;
use crate::embeddings::{OllamaClient, vector_name};
use crate::indexer::{Indexer, IngestOptions, IngestReport};

/// Arguments for an ingestion run, mirroring the CLI surface.
#[derive(Debug, Clone)]
pub struct IngestArgs {
    pub paths: Vec<PathBuf>,
    pub recursive: bool,
    pub ext: String,
    pub collection: Option<String>,
    pub force: bool,
    pub prune: bool,
    pub vault_root: Option<PathBuf>,
    pub doc_type: Option<String>,
    pub category: Option<String>,
}

/// Run document ingestion and print the JSON run summary.
#[inline]
pub async fn ingest(args: IngestArgs) -> Result<IngestReport> {
    let mut config = Config::load()?;
    if let Some(name) = args.collection {
        config.qdrant.collection = name;
    }

    info!(
        "Starting ingestion into collection '{}'",
        config.qdrant.collection
    );

    let indexer = Indexer::new(config).await?;

    let extensions: Vec<String> = args
        .ext
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let options = IngestOptions {
        force: args.force,
        prune: args.prune,
        overrides: DocumentOverrides {
            doc_type: args.doc_type,
            category: args.category,
            vault_root: args.vault_root,
        },
    };

    let report = indexer
        .ingest(&args.paths, args.recursive, &extensions, &options)
        .await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
    );

    if !report.failures.is_empty() {
        let details = report
            .failures
            .iter()
            .map(|f| format!("  {}: {}", f.path, f.reason))
            .join("\n");
        warn!("{} document(s) failed:\n{}", report.failures.len(), details);
    }

    Ok(report)
}

/// Show pipeline status: configuration, fingerprint store, and store health.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load()?;

    println!("vault-indexer status");
    println!();
    println!(
        "Embedding: {:?} model '{}' ({} dimensions, batch {})",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimension,
        config.embedding.batch_size
    );
    println!(
        "Collection: '{}' at {} (named vector '{}', {:?})",
        config.qdrant.collection,
        config.qdrant.url,
        vector_name(&config.embedding.model),
        config.qdrant.distance
    );
    println!(
        "Chunking: {} chars with {} overlap",
        config.chunking.chunk_size, config.chunking.overlap
    );

    let data_dir = config
        .data_dir()
        .context("Failed to determine data directory")?;
    let database = Database::initialize_from_dir(&data_dir)
        .await
        .context("Failed to open fingerprint store")?;
    println!(
        "Fingerprinted documents: {}",
        database.count_fingerprints().await?
    );

    let store = QdrantStore::new(&config.qdrant)?;
    match store.healthy().await {
        Ok(()) => println!("Vector store: reachable"),
        Err(e) => println!("Vector store: UNREACHABLE ({e})"),
    }

    if config.embedding.provider == ProviderKind::Ollama {
        let client = OllamaClient::new(&config.embedding)?;
        match client.health_check() {
            Ok(()) => println!("Ollama: reachable, model available"),
            Err(e) => println!("Ollama: UNAVAILABLE ({e})"),
        }
    }

    Ok(())
}

/// Print the active configuration as TOML.
#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load()?;
    let path = Config::config_file_path().context("Failed to determine config file path")?;

    println!("# {}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize configuration")?
    );

    Ok(())
}

/// Drop and recreate the target collection.
///
/// Destroys every stored point; refuses to run without the confirmation
/// flag. This is the only path that changes an existing collection schema.
#[inline]
pub async fn recreate_collection(collection: Option<String>, confirmed: bool) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(name) = collection {
        config.qdrant.collection = name;
    }

    if !confirmed {
        bail!(
            "Recreating collection '{}' deletes all of its points. \
             Re-run with --yes to confirm.",
            config.qdrant.collection
        );
    }

    let spec = CollectionSpec {
        name: config.qdrant.collection.clone(),
        vector_name: vector_name(&config.embedding.model),
        dimension: config.embedding.dimension,
        distance: config.qdrant.distance,
    };

    let store = QdrantStore::new(&config.qdrant)?;
    store.recreate_collection(&spec).await?;

    println!(
        "Collection '{}' recreated with named vector '{}' ({} dimensions)",
        spec.name, spec.vector_name, spec.dimension
    );

    Ok(())
}
