use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wingman::Result;
use wingman::commands::{ask, build_index, chat, search, show_status};
use wingman::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "wingman")]
#[command(about = "Semantic search and explanation over a database metadata catalog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding model, explanation backend and retrieval limits
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the vector index from a catalog JSON file, replacing any existing index
    Build {
        /// Path to the catalog JSON file
        #[arg(long)]
        catalog: PathBuf,
    },
    /// Find the catalog fields most relevant to a query
    Search {
        query: String,
        /// Number of fields to return
        #[arg(long)]
        top_k: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find relevant fields and explain them
    Ask {
        query: String,
        /// Only search, do not contact the explanation backend
        #[arg(long)]
        no_explain: bool,
        /// Deadline in seconds; late retrieval fails, a late explanation is dropped
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask questions interactively
    Chat {
        /// Only search, do not contact the explanation backend
        #[arg(long)]
        no_explain: bool,
    },
    /// Show the state of the index and the external services
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Build { catalog } => {
            build_index(&catalog).await?;
        }
        Commands::Search { query, top_k, json } => {
            search(&query, top_k, json).await?;
        }
        Commands::Ask {
            query,
            no_explain,
            timeout,
            json,
        } => {
            ask(&query, !no_explain, timeout, json).await?;
        }
        Commands::Chat { no_explain } => {
            chat(!no_explain).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
