//! # Portfolio RAG CLI (`prag`)
//!
//! Builds the vector index from the site's content tree and serves the
//! question-answering API.
//!
//! ## Usage
//!
//! ```bash
//! prag --config ./config/prag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `prag ingest` | Embed files changed since the last rebuild |
//! | `prag checkpoint` | Show or reset the last-rebuild checkpoint |
//! | `prag search "<query>"` | Show what retrieval returns for a query |
//! | `prag ask "<question>"` | Run the full answer pipeline once |
//! | `prag serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # First build (or rebuild from scratch)
//! prag ingest --full
//!
//! # Pick up edited posts
//! prag ingest
//!
//! # Check retrieval before asking
//! prag search "ManaBurn backend" --k 3
//!
//! prag serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use portfolio_rag::checkpoint::CheckpointStore;
use portfolio_rag::config;
use portfolio_rag::context::AppContext;
use portfolio_rag::ingest;
use portfolio_rag::logging;
use portfolio_rag::models::QueryRequest;
use portfolio_rag::pipeline;
use portfolio_rag::retrieve;
use portfolio_rag::server;

/// Portfolio RAG: answers questions about one person's professional
/// background from their site content.
#[derive(Parser)]
#[command(name = "prag", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/prag.toml")]
    config: PathBuf,

    /// Log filter, e.g. `debug` or `portfolio_rag=trace`. Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable colored log output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed content files modified since the last successful rebuild.
    ///
    /// Scans the content root, chunks and embeds every changed file, persists
    /// the index, then moves the checkpoint forward.
    Ingest {
        /// Ignore the checkpoint and rebuild the index from scratch.
        #[arg(long)]
        full: bool,

        /// Report what would be ingested without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the last-rebuild checkpoint.
    Checkpoint {
        /// Reset to the epoch so the next ingest picks up every file.
        #[arg(long)]
        reset: bool,
    },

    /// Print the chunks retrieved for a query, with similarity scores.
    Search {
        query: String,

        /// Number of chunks (defaults to `retrieval.k`).
        #[arg(long)]
        k: Option<usize>,

        /// Similarity floor (defaults to `retrieval.min_similarity`).
        #[arg(long)]
        min_similarity: Option<f32>,
    },

    /// Answer one question and print the result.
    Ask {
        question: String,

        /// Use this OpenAI key instead of the configured one.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Start the HTTP API.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref(), cli.no_color)?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { full, dry_run } => {
            ingest::run_ingest(&cfg, full, dry_run).await?;
        }
        Commands::Checkpoint { reset } => {
            let store = CheckpointStore::new(cfg.index.checkpoint_path());
            if reset {
                store.reset()?;
                println!("Checkpoint reset: {}", store.path().display());
            } else {
                println!("{}", store.get()?.to_rfc3339());
            }
        }
        Commands::Search {
            query,
            k,
            min_similarity,
        } => {
            retrieve::run_search(&cfg, &query, k, min_similarity).await?;
        }
        Commands::Ask { question, api_key } => {
            let ctx = AppContext::from_config(cfg)?;
            let result = pipeline::answer(
                &ctx,
                &QueryRequest {
                    question,
                    caller_api_key: api_key,
                },
            )
            .await?;
            println!("{}", result.text);
            if !result.sources.is_empty() {
                println!();
                for source in &result.sources {
                    match source.similarity {
                        Some(s) => println!("  [{:.3}] {}", s, source.source_path),
                        None => println!("  {}", source.source_path),
                    }
                }
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
