//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (method, uri, status, latency)
//! 3. `AuthenticatedUser` extractor on every `/api` handler

pub mod auth;

pub use auth::{ApiTokenSigner, AuthenticatedUser, TokenError};
