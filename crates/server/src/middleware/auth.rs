//! Bearer token authentication.
//!
//! API tokens have the form `<user_id>.<expires_at>.<signature>` where
//! `expires_at` is a Unix timestamp and `signature` is the hex HMAC-SHA256 of
//! `<user_id>.<expires_at>` under `API_TOKEN_SECRET`. Tokens are minted with
//! `ml-cli token issue`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use marketlink_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// Reasons a bearer token is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("signing key rejected: {0}")]
    Key(String),
}

/// Issues and verifies API bearer tokens.
#[derive(Clone)]
pub struct ApiTokenSigner {
    secret: SecretString,
}

impl std::fmt::Debug for ApiTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTokenSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl ApiTokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<Hmac<Sha256>, TokenError> {
        Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| TokenError::Key(e.to_string()))
    }

    /// Mint a token for `user_id` that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the HMAC cannot be keyed.
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<String, TokenError> {
        self.issue_until(user_id, Utc::now() + ttl)
    }

    fn issue_until(&self, user_id: UserId, expires_at: DateTime<Utc>) -> Result<String, TokenError> {
        let payload = format!("{user_id}.{}", expires_at.timestamp());
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        Ok(format!("{payload}.{}", hex::encode(mac.finalize().into_bytes())))
    }

    /// Check the signature and expiry of `token` and return its user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token is malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (user_id, expires_at) = payload.split_once('.').ok_or(TokenError::Malformed)?;
        let user_id: i32 = user_id.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        if expires_at <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        let user_id = UserId::new(user_id);
        if !user_id.is_positive() {
            return Err(TokenError::Malformed);
        }
        Ok(user_id)
    }
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(AuthenticatedUser(user_id): AuthenticatedUser) -> String {
///     format!("hello user {user_id}")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let user_id = state.token_signer().verify(token.trim()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized(e.to_string())
        })?;

        sentry::configure_scope(|scope| {
            scope.set_user(Some(sentry::User {
                id: Some(user_id.to_string()),
                ..Default::default()
            }));
        });

        Ok(Self(user_id))
    }
}
