//! GOMFLOW CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! gomflow migrate
//!
//! # Grant or revoke GOM access
//! gomflow gom promote -e gom@example.com
//! gomflow gom demote -e gom@example.com
//!
//! # Settle every open order now (MOQ reached / deadline passed)
//! gomflow orders sweep
//!
//! # Check one order by its shareable slug
//! gomflow orders check -s k3v9x0qa
//! ```
//!
//! # Environment Variables
//!
//! - `GOMFLOW_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gomflow")]
#[command(author, version, about = "GOMFLOW CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage GOM access
    Gom {
        #[command(subcommand)]
        action: GomAction,
    },
    /// Group order maintenance
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum GomAction {
    /// Allow a profile to create group orders
    Promote {
        /// Profile email address
        #[arg(short, long)]
        email: String,
    },
    /// Remove a profile's GOM access
    Demote {
        /// Profile email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Apply due status transitions to every open order
    Sweep,
    /// Apply due status transitions to one order and print it
    Check {
        /// Shareable slug of the order
        #[arg(short, long)]
        slug: String,
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
        Commands::Gom { action } => match action {
            GomAction::Promote { email } => commands::gom::set_gom(&email, true).await?,
            GomAction::Demote { email } => commands::gom::set_gom(&email, false).await?,
        },
        Commands::Orders { action } => match action {
            OrdersAction::Sweep => commands::orders::sweep().await?,
            OrdersAction::Check { slug } => commands::orders::check(&slug).await?,
        },
    }
    Ok(())
}
