//! Stride CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! stride-cli migrate
//!
//! # Create a staff account (prints a generated password if none is given)
//! stride-cli admin create -e owner@stride.shoes -n "Store Owner" -r super_admin
//!
//! # Load products, filters and banners from YAML
//! stride-cli seed catalog -f catalog.yaml --actor owner@stride.shoes
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "stride-cli")]
#[command(author, version, about = "Stride CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage staff accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a staff account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin` or `super_admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Password; a random one is generated and printed when omitted
        #[arg(short, long, env = "STRIDE_ADMIN_PASSWORD")]
        password: Option<String>,
    },
    /// Promote an existing account to staff
    Promote {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Products, filters and banners from a YAML file
    Catalog {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,

        /// Staff email recorded on the initial stock movements
        #[arg(short, long)]
        actor: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::admin::create_user(&email, &name, &role, password).await?;
            }
            AdminAction::Promote { email, role } => {
                commands::admin::promote(&email, &role).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file, actor } => {
                commands::seed::catalog(&file, &actor).await?;
            }
        },
    }
    Ok(())
}
