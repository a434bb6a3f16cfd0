//! worldsync CLI - runs `members.csv` and `worlds.csv` imports against a
//! nakamura server.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use worldsync_core::ImportKind;

mod commands;
mod error;
mod input;

use error::CliResult;

/// worldsync - reconcile worlds and their rosters from CSV exports
#[derive(Parser)]
#[command(name = "worldsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile role memberships from a members.csv file
    Members(commands::ImportArgs),

    /// Create or update worlds from a worlds.csv file
    Worlds(commands::ImportArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,worldsync_core=debug")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Members(args) => commands::execute(ImportKind::Members, args).await,
        Commands::Worlds(args) => commands::execute(ImportKind::Worlds, args).await,
    }
}
