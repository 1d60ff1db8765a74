// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mnemo - conversational memory retrieval.
//!
//! This is the binary entry point: it loads configuration, wires the
//! storage, embedding, and reranking services, and runs one subcommand.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod embed;
mod reindex;
mod search;
mod stats;

use clap::{Parser, Subcommand};

/// Mnemo - conversational memory retrieval.
#[derive(Parser, Debug)]
#[command(name = "mnemo", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Find a user's past conversations relevant to a query.
    Search {
        /// Owner of the conversations to search.
        #[arg(long)]
        user: i64,
        /// Query text.
        #[arg(long)]
        query: String,
        /// Conversation to leave out, usually the active one.
        #[arg(long)]
        exclude: Option<String>,
        /// Number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,
        /// Rank by raw similarity only.
        #[arg(long)]
        no_rerank: bool,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Recompute summary vectors and backfill message embeddings.
    Reindex {
        #[arg(long)]
        user: i64,
        /// Only this conversation; otherwise every conversation of the user.
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Show vector counts and the active embedding backend.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Embed a text and print the vector.
    Embed {
        #[arg(long)]
        text: String,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match mnemo_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            mnemo_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.runtime.log_level);
    mnemo_memory::metrics::register_metrics();

    let result = match cli.command {
        Commands::Config => print_config(&config),
        Commands::Embed { text } => embed::run_embed(&config, &text).await,
        Commands::Stats { json } => stats::run_stats(&config, json).await,
        Commands::Reindex { user, conversation } => {
            reindex::run_reindex(&config, user, conversation.as_deref()).await
        }
        Commands::Search {
            user,
            query,
            exclude,
            top_k,
            no_rerank,
            json,
        } => {
            let args = search::SearchArgs {
                user_id: user,
                query,
                exclude,
                top_k,
                rerank: !no_rerank,
                json,
            };
            search::run_search(&config, &args).await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &mnemo_config::MnemoConfig) -> Result<(), mnemo_core::MnemoError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| mnemo_core::MnemoError::Config(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mnemo={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
