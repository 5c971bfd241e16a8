use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vault_indexer::Result;
use vault_indexer::commands::{IngestArgs, ingest, recreate_collection, show_config, show_status};

#[derive(Parser)]
#[command(name = "vault-indexer")]
#[command(about = "Index markdown notes into a Qdrant collection for semantic retrieval")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents into the vector collection
    Ingest {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Recurse into directories
        #[arg(long)]
        recursive: bool,
        /// Comma-separated list of file extensions to include
        #[arg(long, default_value = "md,txt")]
        ext: String,
        /// Target collection name, overriding the configured one
        #[arg(long)]
        collection: Option<String>,
        /// Re-embed documents even when their content hash is unchanged
        #[arg(long)]
        force: bool,
        /// Tombstone points of documents missing from the input set
        #[arg(long)]
        prune: bool,
        /// Derive document identity from paths relative to this root
        #[arg(long)]
        vault_root: Option<PathBuf>,
        /// Override the document type for all inputs
        /// (note|meeting|one-on-one|email|calendar|slack)
        #[arg(long = "type")]
        doc_type: Option<String>,
        /// Override the category for all inputs
        #[arg(long)]
        category: Option<String>,
    },
    /// Show pipeline status: configuration, fingerprints, and store health
    Status,
    /// Show the active configuration
    Config,
    /// Drop and recreate the target collection (destroys all points)
    RecreateCollection {
        /// Target collection name, overriding the configured one
        #[arg(long)]
        collection: Option<String>,
        /// Confirm the destructive recreate
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            paths,
            recursive,
            ext,
            collection,
            force,
            prune,
            vault_root,
            doc_type,
            category,
        } => {
            let report = ingest(IngestArgs {
                paths,
                recursive,
                ext,
                collection,
                force,
                prune,
                vault_root,
                doc_type,
                category,
            })
            .await?;

            if report.failed > 0 || report.halted.is_some() {
                std::process::exit(1);
            }
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Config => {
            show_config()?;
        }
        Commands::RecreateCollection { collection, yes } => {
            recreate_collection(collection, yes).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["vault-indexer", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn ingest_with_flags() {
        let cli = Cli::try_parse_from([
            "vault-indexer",
            "ingest",
            "/vault/meetings",
            "--recursive",
            "--ext",
            "md,txt",
            "--collection",
            "personal_assistant",
            "--vault-root",
            "/vault",
            "--force",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest {
                paths,
                recursive,
                collection,
                force,
                prune,
                ..
            } = parsed.command
            {
                assert_eq!(paths, vec![PathBuf::from("/vault/meetings")]);
                assert!(recursive);
                assert!(force);
                assert!(!prune);
                assert_eq!(collection, Some("personal_assistant".to_string()));
            }
        }
    }

    #[test]
    fn ingest_requires_paths() {
        let cli = Cli::try_parse_from(["vault-indexer", "ingest"]);
        assert!(cli.is_err());
    }

    #[test]
    fn type_override_flag() {
        let cli = Cli::try_parse_from([
            "vault-indexer",
            "ingest",
            "note.md",
            "--type",
            "meeting",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { doc_type, .. } = parsed.command {
                assert_eq!(doc_type, Some("meeting".to_string()));
            }
        }
    }

    #[test]
    fn recreate_collection_flags() {
        let cli = Cli::try_parse_from(["vault-indexer", "recreate-collection", "--yes"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::RecreateCollection { collection, yes } = parsed.command {
                assert!(yes);
                assert_eq!(collection, None);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["vault-indexer", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["vault-indexer", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
