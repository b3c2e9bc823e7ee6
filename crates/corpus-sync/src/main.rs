//! # corpus-sync CLI (`csync`)
//!
//! ## Usage
//!
//! ```bash
//! csync --config ./config/csync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `csync init` | Create the SQLite database and run schema migrations |
//! | `csync index <type>` | Sync a file type's source directory into the index |
//! | `csync delete <type> <paths...>` | Delete every entry of the given files |
//! | `csync export <type>` | Write entries as JSONL |
//! | `csync stats` | Entry and date counts per file type |
//! | `csync model <name> --owner <owner>` | Set an owner's embedding model |
//! | `csync completions <shell>` | Print shell completions |
//!
//! Logs go to stderr and are filtered by `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use corpus_sync::{config, export, ingest, migrate, model_cmd, stats};
use corpus_sync_core::FileType;

/// corpus-sync CLI: incremental indexing of notes into an embedded
/// entry store.
///
/// All commands except `completions` read a TOML configuration file
/// given by `--config`.
#[derive(Parser)]
#[command(
    name = "csync",
    about = "corpus-sync: incremental indexing of notes into an embedded entry store",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/csync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the entries, entry_dates, and
    /// search_models tables. Running it again is safe.
    Init,

    /// Sync a file type's configured source directory into the index.
    ///
    /// Only entries whose content is not yet indexed are embedded. Entries
    /// that disappeared from a scanned file are deleted.
    Index {
        /// File type: `markdown`, `org`, or `plaintext`.
        file_type: FileType,

        /// Index on behalf of this owner.
        #[arg(long)]
        owner: Option<String>,

        /// Delete all of the owner's entries of this type and re-embed everything.
        #[arg(long)]
        regenerate: bool,

        /// Treat the scan as a partial update: empty files delete their entries.
        #[arg(long)]
        changed_only: bool,
    },

    /// Delete every entry of the given files.
    Delete {
        /// File type the entries were indexed as.
        file_type: FileType,

        /// File paths, relative to the source root.
        #[arg(required = true)]
        paths: Vec<String>,

        #[arg(long)]
        owner: Option<String>,
    },

    /// Export entries as JSONL.
    Export {
        file_type: FileType,

        #[arg(long)]
        owner: Option<String>,

        /// Output file path. Defaults to stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show entry and date counts per file type.
    Stats {
        #[arg(long)]
        owner: Option<String>,
    },

    /// Set the embedding model used for an owner's entries.
    Model {
        /// Model name as served by the configured provider.
        name: String,

        #[arg(long)]
        owner: String,
    },

    /// Print shell completions to stdout.
    Completions {
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "csync", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index {
            file_type,
            owner,
            regenerate,
            changed_only,
        } => {
            ingest::run_index(&cfg, file_type, owner.as_deref(), regenerate, changed_only).await?;
        }
        Commands::Delete {
            file_type,
            paths,
            owner,
        } => {
            ingest::run_delete(&cfg, file_type, &paths, owner.as_deref()).await?;
        }
        Commands::Export {
            file_type,
            owner,
            output,
        } => {
            export::run_export(&cfg, file_type, owner.as_deref(), output.as_deref()).await?;
        }
        Commands::Stats { owner } => {
            stats::run_stats(&cfg, owner.as_deref()).await?;
        }
        Commands::Model { name, owner } => {
            model_cmd::run_set_model(&cfg, &owner, &name).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
