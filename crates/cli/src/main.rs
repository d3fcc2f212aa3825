//! Dar Sellami CLI - database migrations and admin account management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! ds-cli migrate storefront
//!
//! # Run admin database migrations
//! ds-cli migrate admin
//!
//! # Run all database migrations
//! ds-cli migrate all
//!
//! # Create an admin account
//! ds-cli admin create -e chef@darsellami.tn
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create an admin account
//! - `admin hash-password` - Print SQL that resets a password
//! - `admin deactivate` - Retire an admin account

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ds-cli")]
#[command(author, version, about = "Dar Sellami CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations
    Storefront,
    /// Run admin database migrations
    Admin,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new active admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Password; a random one is generated and printed when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Print the SQL that resets an admin password
    HashPassword {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// New password
        #[arg(short, long)]
        password: String,
    },
    /// Deactivate an admin account
    Deactivate {
        /// Admin email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { email, password } => {
                let (id, generated) = commands::admin::create_user(&email, password).await?;
                println!("Created admin {id} <{email}>");
                if let Some(password) = generated {
                    println!("Generated password: {password}");
                }
            }
            AdminAction::HashPassword { email, password } => {
                println!("{}", commands::admin::password_reset_sql(&email, &password)?);
            }
            AdminAction::Deactivate { email } => {
                let count = commands::admin::deactivate_user(&email).await?;
                println!("Deactivated {count} account(s) for {email}");
            }
        },
    }
    Ok(())
}
