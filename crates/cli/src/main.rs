//! wst CLI - Main Entry Point
//!
//! Validates integration test specs and inspects the servers they resolve to.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{servers, validate};

/// wst - declarative integration test runner
#[derive(Parser)]
#[command(name = "wst")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate spec files
    Validate(validate::ValidateArgs),

    /// List resolved servers of a spec
    Servers(servers::ServersArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Validate(args) => validate::execute(args)?,
        Commands::Servers(args) => servers::execute(args, cli.format)?,
        Commands::Version => {
            println!("wst v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
