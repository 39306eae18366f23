//! # Knowbase CLI (`kb`)
//!
//! The `kb` binary is the one-shot interface for Knowbase. It provides
//! commands for corpus inspection, retrieval debugging, question
//! answering, and starting the HTTP entry point.
//!
//! ## Usage
//!
//! ```bash
//! kb --config ./config/kb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kb index` | Scan the knowledge directory and print corpus stats |
//! | `kb search "<query>"` | Ranked retrieval with scores and previews |
//! | `kb ask "<question>"` | Answer a question through the full pipeline |
//! | `kb serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Inspect what is indexed
//! kb index --config ./config/kb.toml
//!
//! # Debug retrieval without touching the language model
//! kb search "gameplay faq" --config ./config/kb.toml
//!
//! # Full pipeline (set OPENAI_API_KEY to enable generation)
//! kb ask "How do I save my game?" --config ./config/kb.toml
//!
//! # Serve POST /ask for webhook workers
//! kb serve --config ./config/kb.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use knowbase::{config, index, pipeline, search, server};

/// Knowbase CLI: file-backed retrieval-augmented question answering
/// for small documentation sets.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kb.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "kb",
    about = "Knowbase — question answering over a directory of documentation",
    version,
    long_about = "Knowbase scans a directory of text files into an in-memory TF-IDF index \
    and answers free-form questions against it, refining queries and generating answers \
    with an optional language-model provider. Without credentials it degrades to plain \
    ranked retrieval."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/kb.toml`. The knowledge directory, retrieval
    /// tuning, completion provider, and server settings are read from it.
    #[arg(long, global = true, default_value = "./config/kb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Scan the knowledge directory and print corpus statistics.
    ///
    /// Creates the directory if it does not exist yet. Useful for
    /// verifying configuration and corpus health before serving.
    Index,

    /// Search the corpus and print ranked results.
    ///
    /// Runs the same retrieval the answer pipeline uses (TF-IDF plus
    /// filename and exact-phrase bonuses) without any language-model
    /// calls. Intended for retrieval debugging.
    Search {
        /// The search query string.
        query: String,
    },

    /// Answer a question through the full pipeline.
    ///
    /// Refines the question into keywords, retrieves context, and
    /// generates an answer. Without an `OPENAI_API_KEY` the command
    /// still works: it searches with the raw question and lists the
    /// matching documents instead of generating prose.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and exposes
    /// `POST /ask` and `GET /health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("knowbase=info,kb=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index => {
            index::run_stats(&cfg).await?;
        }
        Commands::Search { query } => {
            search::run_search(&cfg, &query).await?;
        }
        Commands::Ask { question } => {
            pipeline::run_ask(&cfg, &question).await?;
        }
        Commands::Serve => {
            server::run_server(cfg).await?;
        }
    }

    Ok(())
}
