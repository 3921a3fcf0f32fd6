//! API token commands.
//!
//! # Usage
//!
//! ```bash
//! ml-cli token issue --user-id 7 --ttl-hours 720
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string (the user must exist)
//! - `API_TOKEN_SECRET` - Signing secret shared with the server

use secrecy::SecretString;
use thiserror::Error;

use marketlink_core::UserId;
use marketlink_server::db::{self, PgUserRepository, RepositoryError, UserRepository};
use marketlink_server::middleware::{ApiTokenSigner, TokenError};

use super::{MissingEnvVar, required_env};

/// Errors that can occur while issuing a token.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("No user with id {0}")]
    UnknownUser(UserId),

    #[error("TTL must be between 1 and {max} hours", max = MAX_TTL_HOURS)]
    InvalidTtl,

    #[error("Token signing failed: {0}")]
    Signing(#[from] TokenError),
}

/// One year.
const MAX_TTL_HOURS: i64 = 24 * 366;

/// Issue a bearer token for an existing user and print it to stdout.
///
/// # Errors
///
/// Returns `IssueError` if the user does not exist, the TTL is out of range
/// or configuration is missing.
pub async fn issue(user_id: i32, ttl_hours: i64) -> Result<(), IssueError> {
    dotenvy::dotenv().ok();

    if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
        return Err(IssueError::InvalidTtl);
    }

    let user_id = UserId::new(user_id);
    let secret = SecretString::from(required_env("API_TOKEN_SECRET")?);
    let database_url = SecretString::from(required_env("DATABASE_URL")?);

    let pool = db::create_pool(&database_url).await?;
    let user = PgUserRepository::new(pool)
        .get_by_id(user_id)
        .await?
        .ok_or(IssueError::UnknownUser(user_id))?;

    let token = ApiTokenSigner::new(secret).issue(user.id, chrono::Duration::hours(ttl_hours))?;

    tracing::info!("Token issued for {} ({}), expires in {} hours", user.email, user.id, ttl_hours);

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }

    Ok(())
}
