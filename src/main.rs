//! # Caselaw CLI (`caselaw`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `caselaw bootstrap` | Ensure the index exists and ingest the corpus if it is empty |
//! | `caselaw search "<query>"` | Diversity-aware search over the index |
//! | `caselaw stats` | Record count and dimension of the index |
//! | `caselaw serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # See what would be ingested
//! caselaw bootstrap --dry-run --config ./config/caselaw.toml
//!
//! # Ingest into a specific index even if it already has vectors
//! caselaw bootstrap --index cases-v2 --force
//!
//! # Search
//! caselaw search "fourth amendment search of vehicle" --limit 5
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use caselaw::bootstrap::{run_bootstrap, BootstrapOptions};
use caselaw::config::{load_config, Config};
use caselaw::{search, server, stats};

/// Semantic search over legal-case PDFs.
///
/// API keys are read from `PINECONE_API_KEY` and `VOYAGE_API_KEY`; the
/// index name from `[index].name` or `PINECONE_INDEX`.
#[derive(Parser)]
#[command(
    name = "caselaw",
    about = "Caselaw — semantic search over legal-case PDFs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/caselaw.toml`. When the file does not exist,
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/caselaw.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the index exists and ingest documents if it is empty.
    ///
    /// Safe to re-run: an index that already holds vectors is left alone.
    Bootstrap {
        /// Target index (overrides config and `PINECONE_INDEX`).
        #[arg(long)]
        index: Option<String>,

        /// Load and split only; print counts without calling any provider.
        #[arg(long)]
        dry_run: bool,

        /// Ingest even when the index already has vectors.
        #[arg(long)]
        force: bool,
    },

    /// Search the index.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show index statistics.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caselaw=info,caselaw_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        tracing::warn!(path = %cli.config.display(), "config file not found; using defaults");
        Config::minimal()
    };

    match cli.command {
        Commands::Bootstrap {
            index,
            dry_run,
            force,
        } => {
            run_bootstrap(cfg, index, BootstrapOptions { force, dry_run }).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(cfg).await?;
        }
    }

    Ok(())
}
