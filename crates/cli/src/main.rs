//! Pod Placement Analyzer CLI
//!
//! A command-line tool for inspecting pod displacement chains, either
//! offline from a snapshot file or from a running analyzer service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analyze, displacements, service, snapshot};
use tracing_subscriber::EnvFilter;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Pod Placement Analyzer CLI
#[derive(Parser)]
#[command(name = "ppa")]
#[command(author, version, about = "CLI for the Pod Placement Analyzer", long_about = None)]
pub struct Cli {
    /// Analyzer service URL (can also be set via PPA_API_URL env var)
    #[arg(long, env = "PPA_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute displacement chains offline from a snapshot file
    Analyze {
        /// Snapshot file (JSON object of owner key -> records)
        snapshot: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Query a running analyzer
    #[command(subcommand)]
    Get(GetCommands),

    /// Ask the analyzer to recompute chains now
    Recompute,

    /// Export or import the analyzer's record store
    #[command(subcommand)]
    Snapshot(SnapshotCommands),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only show chains with at least this many displacements
    #[arg(long)]
    pub min_length: Option<usize>,

    /// Filter by namespace
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Filter by owner key (namespace/kind/name)
    #[arg(long)]
    pub owner: Option<String>,
}

#[derive(Subcommand)]
pub enum GetCommands {
    /// Get displacement chains
    Displacements {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Get record store and recompute status
    Status,
}

#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Export the record store
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Replace the record store with a snapshot file
    Import {
        /// Snapshot file to upload
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    let file_config = config::Config::load()?;
    let default_min_length = file_config.min_chain_length.unwrap_or(1);

    if let Commands::Analyze { snapshot, filter } = &cli.command {
        return analyze::analyze_snapshot(snapshot, filter, default_min_length, cli.format);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(|| file_config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Analyze { .. } => {}
        Commands::Get(get_cmd) => match get_cmd {
            GetCommands::Displacements { filter } => {
                displacements::get_displacements(&client, &filter, default_min_length, cli.format)
                    .await?;
            }
            GetCommands::Status => {
                service::show_status(&client, cli.format).await?;
            }
        },
        Commands::Recompute => {
            service::recompute(&client, cli.format).await?;
        }
        Commands::Snapshot(snapshot_cmd) => match snapshot_cmd {
            SnapshotCommands::Export { output } => {
                snapshot::export_snapshot(&client, output).await?;
            }
            SnapshotCommands::Import { file } => {
                snapshot::import_snapshot(&client, &file).await?;
            }
        },
    }

    Ok(())
}
