//! Marketlink CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ml-cli migrate
//!
//! # Create a user (password is read from stdin)
//! ml-cli user create -e seller@example.com
//!
//! # Mint an API bearer token for user 7, valid for 30 days
//! ml-cli token issue --user-id 7 --ttl-hours 720
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create users
//! - `token issue` - Issue API bearer tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ml-cli")]
#[command(author, version, about = "Marketlink CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage API tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a bearer token for an existing user
    Issue {
        /// User the token authenticates as
        #[arg(short, long)]
        user_id: i32,

        /// Hours until the token expires
        #[arg(short, long, default_value_t = 24)]
        ttl_hours: i64,
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
        Commands::User { action } => match action {
            UserAction::Create { email } => {
                commands::user::create_user(&email).await?;
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue { user_id, ttl_hours } => {
                commands::token::issue(user_id, ttl_hours).await?;
            }
        },
    }
    Ok(())
}
