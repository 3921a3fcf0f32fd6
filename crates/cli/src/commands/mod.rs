//! CLI command implementations.

pub mod migrate;
pub mod token;
pub mod user;

/// Read a required environment variable.
pub(crate) fn required_env(name: &'static str) -> Result<String, MissingEnvVar> {
    std::env::var(name).map_err(|_| MissingEnvVar(name))
}

/// A required environment variable is not set.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);
