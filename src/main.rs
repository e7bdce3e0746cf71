//! Strata CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "File dependency graphs with cycle resolution and layering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Repository root path (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the repository and write the graph and report
    Analyze {
        /// Ignore the incremental state and reprocess every file
        #[arg(long)]
        full: bool,

        /// Analyze and print the report without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Where to write the graph JSON (default from configuration)
        #[arg(long)]
        graph_out: Option<PathBuf>,

        /// Where to write the markdown report (default from configuration)
        #[arg(long)]
        report_out: Option<PathBuf>,
    },
    /// Show how the repository changed across recorded runs
    Evolution,
    /// Clear the cache
    Clear,
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("strata={log_level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Repository root: {}", cli.root.display());

    match cli.command {
        Commands::Analyze {
            full,
            dry_run,
            graph_out,
            report_out,
        } => commands::analyze(cli.root, full, dry_run, graph_out, report_out),
        Commands::Evolution => commands::evolution(cli.root),
        Commands::Clear => commands::clear(cli.root),
        Commands::Version => {
            println!("Strata v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
