//! Arbor CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Typed hierarchical dependency graphs for object-oriented codebases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Repository root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an exported workspace and save the graph
    Analyze {
        /// Workspace file exported by a language front end
        workspace: PathBuf,

        /// Where to write the graph (.json or binary); defaults to .arbor/graph.json
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Analyzer config; defaults to arbor.toml under the root when present
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print element and dependency counts of a saved graph
    Stats {
        /// Saved graph; defaults to .arbor/graph.json
        graph: Option<PathBuf>,
    },
    /// List groups of mutually dependent elements
    Cycles {
        /// Saved graph; defaults to .arbor/graph.json
        graph: Option<PathBuf>,
    },
    /// Remove elements by full name and save the graph in place
    Prune {
        graph: PathBuf,

        #[arg(required = true)]
        full_names: Vec<String>,
    },
    /// Clear the cache
    Clear,
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("arbor={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Arbor v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Repository root: {}", cli.root.display());

    match cli.command {
        Commands::Analyze {
            workspace,
            out,
            config,
        } => commands::analyze(cli.root, workspace, out, config),
        Commands::Stats { graph } => commands::stats(cli.root, graph),
        Commands::Cycles { graph } => commands::cycles(cli.root, graph),
        Commands::Prune { graph, full_names } => commands::prune(graph, full_names),
        Commands::Clear => commands::clear(cli.root),
        Commands::Version => {
            println!("Arbor v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
