//! # Civic Desk CLI (`civic`)
//!
//! ## Usage
//!
//! ```bash
//! civic --config ./config/civic.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `civic serve` | Start the HTTP API |
//! | `civic ask "<query>"` | Answer one question from the command line |
//! | `civic search "<query>"` | List raw vector index matches |
//! | `civic index` | Embed store documents into the vector index |
//!
//! API keys are read from the environment; a `.env` file in the working
//! directory is loaded first if present. Log verbosity follows `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use civic_desk::chat::{ChatRequest, ChatService};
use civic_desk::{config, index_cmd, search_cmd, server};

/// Civic Desk: question answering over a municipal site's circulars and acts.
#[derive(Parser)]
#[command(
    name = "civic",
    about = "Civic Desk: question answering over a municipal site's circulars and acts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/civic.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Answer one question and print the result.
    Ask {
        /// The question.
        query: String,

        /// Id of the document the previous answer was about.
        #[arg(long)]
        last_id: Option<String>,

        /// Print the full JSON response instead of the answer text.
        #[arg(long)]
        json: bool,
    },

    /// List raw index matches for a query.
    Search {
        /// The search query string.
        query: String,

        /// Number of matches to list (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Flag matches whose text contains this keyword.
        #[arg(long)]
        keyword: Option<String>,
    },

    /// Embed store documents into the vector index.
    ///
    /// Documents already in the index are skipped unless `--full` is given.
    Index {
        /// Re-embed every document, including ones already indexed.
        #[arg(long)]
        full: bool,

        /// Report counts without embedding or writing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask {
            query,
            last_id,
            json,
        } => {
            let request = ChatRequest {
                last_circular_id: last_id,
                ..ChatRequest::new(query)
            };
            request.validate()?;

            let service = ChatService::from_config(&cfg).await?;
            let response = service.answer(&request).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.answer);
                if let Some(meta) = &response.circular_metadata {
                    println!();
                    println!("[{}] {}", meta.id, meta.title);
                }
            }
        }
        Commands::Search {
            query,
            top_k,
            keyword,
        } => {
            search_cmd::run_search(&cfg, &query, top_k, keyword.as_deref()).await?;
        }
        Commands::Index { full, dry_run } => {
            index_cmd::run_index(&cfg, full, dry_run).await?;
        }
    }

    Ok(())
}
