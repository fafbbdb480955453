//! Restaurant CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Create or update the documents table
//! restaurant-cli migrate
//!
//! # Load foods from a YAML file
//! restaurant-cli seed foods --file crates/cli/data/foods.yaml
//!
//! # Replace the whole catalog
//! restaurant-cli seed foods --file crates/cli/data/foods.yaml --clear
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed foods` - Insert food catalog entries

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "restaurant-cli")]
#[command(author, version, about = "Restaurant API operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed collections with data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert foods into the catalog
    Foods {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,

        /// Remove every existing food first
        #[arg(long)]
        clear: bool,
    },
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Foods { file, clear } => commands::seed::foods(&file, clear).await?,
        },
    }
    Ok(())
}
