//! Paper Lantern CLI - catalog seeding and store checks.
//!
//! # Usage
//!
//! ```bash
//! # Seed the catalog from a YAML file
//! pl-cli seed catalog.yaml
//!
//! # Verify the document store is reachable and report collection sizes
//! pl-cli check
//! ```
//!
//! # Commands
//!
//! - `seed` - Load books (and their genres) into the document store
//! - `check` - Ping the document store and print collection counts

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pl-cli")]
#[command(author, version, about = "Paper Lantern Books CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the catalog YAML file
        file: String,

        /// Skip books whose name already exists in the catalog
        #[arg(long, default_value_t = true)]
        skip_existing: bool,
    },
    /// Verify document store connectivity
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed {
            file,
            skip_existing,
        } => commands::seed::catalog(&file, skip_existing).await?,
        Commands::Check => commands::check::store().await?,
    }
    Ok(())
}
