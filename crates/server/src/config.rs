//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `ENCRYPTION_KEY` - Key for stored marketplace tokens (32 bytes used)
//! - `API_TOKEN_SECRET` - HMAC secret for API bearer tokens (min 32 chars, high entropy)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 8080)
//! - `OZON_CLIENT_ID` - Ozon seller client id (Ozon stores are skipped without it)
//! - `WILDBERRIES_API_URL` - Wildberries content API base URL
//! - `OZON_API_URL` - Ozon seller API base URL
//! - `MARKETPLACE_TIMEOUT_SECS` - Per-call timeout for marketplace requests (default: 30)
//! - `MARKETPLACE_CONCURRENCY` - Stores fetched in parallel during aggregation (default: 4)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sample rates (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::crypto::KEY_LEN;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Production Wildberries content API.
pub const DEFAULT_WILDBERRIES_API_URL: &str = "https://suppliers-api.wildberries.ru";
/// Production Ozon seller API.
pub const DEFAULT_OZON_API_URL: &str = "https://api-seller.ozon.ru";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "change-in-production",
    "replace",
    "placeholder",
    "example",
    "default",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
///
/// Implements `Debug` manually so the key material never reaches logs.
#[derive(Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Key for encrypting stored marketplace tokens
    pub encryption_key: SecretString,
    /// HMAC secret for API bearer tokens
    pub api_token_secret: SecretString,
    /// Marketplace client settings
    pub marketplace: MarketplaceConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("encryption_key", &"[REDACTED]")
            .field("api_token_secret", &"[REDACTED]")
            .field("marketplace", &self.marketplace)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

/// Marketplace client configuration shared by every store.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Wildberries API base URL (no trailing slash)
    pub wildberries_base_url: String,
    /// Ozon API base URL (no trailing slash)
    pub ozon_base_url: String,
    /// Ozon seller client id sent alongside every store's API key
    pub ozon_client_id: Option<String>,
    /// Timeout applied to every outbound marketplace call
    pub timeout: Duration,
    /// Upper bound on stores fetched at once during aggregation
    pub concurrency: usize,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            wildberries_base_url: DEFAULT_WILDBERRIES_API_URL.to_string(),
            ozon_base_url: DEFAULT_OZON_API_URL.to_string(),
            ozon_client_id: None,
            timeout: Duration::from_secs(30),
            concurrency: 4,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if `API_TOKEN_SECRET` fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        // Rotating this key orphans every stored token, so a weak one is only
        // reported (see `encryption_key_weakness`), never rejected.
        let encryption_key = get_required_secret("ENCRYPTION_KEY")?;

        let api_token_secret = get_validated_secret("API_TOKEN_SECRET")?;
        validate_secret_length(&api_token_secret, "API_TOKEN_SECRET")?;

        let marketplace = MarketplaceConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            encryption_key,
            api_token_secret,
            marketplace,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether `ENCRYPTION_KEY` will be zero-padded up to the cipher key size.
    #[must_use]
    pub fn encryption_key_is_short(&self) -> bool {
        self.encryption_key.expose_secret().len() < KEY_LEN
    }

    /// Why `ENCRYPTION_KEY` looks weak, if it does.
    #[must_use]
    pub fn encryption_key_weakness(&self) -> Option<ConfigError> {
        validate_secret_strength(self.encryption_key.expose_secret(), "ENCRYPTION_KEY").err()
    }
}

impl MarketplaceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = get_env_or_default("MARKETPLACE_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        let concurrency = get_env_or_default("MARKETPLACE_CONCURRENCY", "4")
            .parse::<usize>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_CONCURRENCY".to_string(), e.to_string())
            })?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MARKETPLACE_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            wildberries_base_url: parse_base_url(
                "WILDBERRIES_API_URL",
                &get_env_or_default("WILDBERRIES_API_URL", DEFAULT_WILDBERRIES_API_URL),
            )?,
            ozon_base_url: parse_base_url(
                "OZON_API_URL",
                &get_env_or_default("OZON_API_URL", DEFAULT_OZON_API_URL),
            )?,
            ozon_client_id: get_optional_env("OZON_CLIENT_ID").filter(|id| !id.trim().is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            concurrency,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an http(s) base URL and drop any trailing slash.
fn parse_base_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
