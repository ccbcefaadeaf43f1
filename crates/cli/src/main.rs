//! QuickBite CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! qb-cli migrate
//!
//! # Load the catalog from a YAML file
//! qb-cli seed products crates/cli/seed/products.yaml
//!
//! # Grant or revoke admin access
//! qb-cli user promote -e owner@quickbite.vn
//! qb-cli user demote -e owner@quickbite.vn
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed products` - Insert catalog products
//! - `user promote|demote` - Change an account's role

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quickbite_core::Role;

mod commands;

#[derive(Parser)]
#[command(name = "qb-cli")]
#[command(author, version, about = "QuickBite CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert catalog products from a YAML file
    Products {
        /// Path to the YAML file
        file: PathBuf,

        /// Insert products even if one with the same name exists
        #[arg(long)]
        allow_duplicates: bool,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Give an account admin access
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an account to a regular customer
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products {
                file,
                allow_duplicates,
            } => {
                commands::seed::products(&file, allow_duplicates).await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Promote { email } => commands::users::set_role(&email, Role::Admin).await?,
            UserAction::Demote { email } => commands::users::set_role(&email, Role::User).await?,
        },
    }
    Ok(())
}
