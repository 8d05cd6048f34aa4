//! Gradus CLI
//!
//! Ingests organizational text into namespaced knowledge bases and grounds
//! queries against them and the document catalog.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CatalogCommand, DeleteCommand, GroundCommand, IngestCommand, StatsCommand};
use gradus_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Gradus - knowledge ingestion and retrieval grounding
#[derive(Parser, Debug)]
#[command(name = "gradus")]
#[command(about = "Knowledge ingestion and retrieval grounding", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "GRADUS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "GRADUS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed and store source files in a namespace
    Ingest(IngestCommand),

    /// Build grounding context for a query
    Ground(GroundCommand),

    /// Remove records from a namespace by id or metadata
    Delete(DeleteCommand),

    /// Show vector store statistics
    Stats(StatsCommand),

    /// Document catalog management
    Catalog(CatalogCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Gradus CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Vector store: {:?}", config.store_backend);

    config.ensure_gradus_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ground(_) => "ground",
        Commands::Delete(_) => "delete",
        Commands::Stats(_) => "stats",
        Commands::Catalog(_) => "catalog",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ground(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Catalog(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
