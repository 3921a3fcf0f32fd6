//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! echo 'correct horse battery staple' | ml-cli user create -e seller@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

use std::io::BufRead;

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use marketlink_core::{Email, EmailError, UserId};
use marketlink_server::db::{self, PgUserRepository, RepositoryError, UserRepository};

use super::{MissingEnvVar, required_env};

/// Minimum password length accepted at creation.
const MIN_PASSWORD_LEN: usize = 8;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Password must be at least {min} characters", min = MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing failed")]
    PasswordHash,

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for UserError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::UserExists(msg),
            other => Self::Repository(other),
        }
    }
}

/// Create a new user, reading the password from the first line of stdin.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `UserError` for an invalid email, a short password, a duplicate
/// account or a database failure.
pub async fn create_user(email: &str) -> Result<UserId, UserError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email)?;
    let password = read_password(std::io::stdin().lock())?;
    let password_hash = hash_password(&password)?;

    let database_url = SecretString::from(required_env("DATABASE_URL")?);

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;
    let users = PgUserRepository::new(pool);

    if users.get_by_email(&email).await?.is_some() {
        return Err(UserError::UserExists(email.to_string()));
    }

    let user = users.create(&email, &password_hash).await?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user.id, user.email);
    tracing::info!("Issue an API token with: ml-cli token issue --user-id {}", user.id);

    Ok(user.id)
}

fn read_password(mut input: impl BufRead) -> Result<SecretString, UserError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(UserError::WeakPassword);
    }
    Ok(SecretString::from(password.to_owned()))
}

/// Hash a password using Argon2id.
fn hash_password(password: &SecretString) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| UserError::PasswordHash)
}
