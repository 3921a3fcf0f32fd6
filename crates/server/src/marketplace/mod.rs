//! Marketplace API clients.
//!
//! Each provider's product listing endpoint is wrapped in a client that
//! returns [`MarketplaceProduct`]s normalized by
//! [`MarketplaceProduct::normalize`]. Clients are built per store by
//! [`MarketplaceClients::for_store`], which shares one `reqwest::Client` (and
//! its timeout) across every call.
//!
//! # Limitations
//!
//! Only the first page of each listing is fetched (1000 cards on
//! Wildberries, 100 items on Ozon).

pub mod ozon;
pub mod wildberries;

pub use ozon::OzonClient;
pub use wildberries::WildberriesClient;

use secrecy::SecretString;
use thiserror::Error;

use marketlink_core::{MarketplaceProduct, StoreType};

use crate::config::MarketplaceConfig;

/// Longest upstream error body kept for diagnostics.
const MAX_ERROR_BODY_LEN: usize = 2048;

/// Errors that can occur when calling a marketplace API.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Credential or client setting missing before any request was made.
    #[error("marketplace configuration error: {0}")]
    Configuration(String),

    /// Provider answered with a non-success status.
    #[error("marketplace returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Request failed before a response arrived (connect, timeout, TLS).
    #[error("marketplace request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the provider's documented shape.
    #[error("marketplace response could not be decoded: {0}")]
    Decode(String),
}

impl MarketplaceError {
    /// Whether the failure came from the provider rather than local setup.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}

/// Builds per-store clients over one shared HTTP client.
#[derive(Debug, Clone)]
pub struct MarketplaceClients {
    http: reqwest::Client,
    config: MarketplaceConfig,
}

impl MarketplaceClients {
    /// Create the shared HTTP client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::Http` if the HTTP client cannot be built.
    pub fn new(config: MarketplaceConfig) -> Result<Self, MarketplaceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("marketlink/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Number of stores the aggregator may fetch at once.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    /// Client for one store of the given provider.
    #[must_use]
    pub fn for_store(&self, store_type: StoreType, token: SecretString) -> MarketplaceClient {
        match store_type {
            StoreType::Wildberries => MarketplaceClient::Wildberries(WildberriesClient::new(
                self.http.clone(),
                &self.config.wildberries_base_url,
                token,
            )),
            StoreType::Ozon => MarketplaceClient::Ozon(OzonClient::new(
                self.http.clone(),
                &self.config.ozon_base_url,
                token,
                self.config.ozon_client_id.clone(),
            )),
        }
    }
}

/// A client for one store, dispatched by provider.
#[derive(Debug, Clone)]
pub enum MarketplaceClient {
    Wildberries(WildberriesClient),
    Ozon(OzonClient),
}

impl MarketplaceClient {
    /// Fetch and normalize the store's products.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::Configuration` if a credential is missing,
    /// otherwise an upstream variant when the provider call fails.
    pub async fn get_products(&self) -> Result<Vec<MarketplaceProduct>, MarketplaceError> {
        match self {
            Self::Wildberries(client) => client.get_products().await,
            Self::Ozon(client) => client.get_products().await,
        }
    }

    #[must_use]
    pub const fn store_type(&self) -> StoreType {
        match self {
            Self::Wildberries(_) => StoreType::Wildberries,
            Self::Ozon(_) => StoreType::Ozon,
        }
    }
}

/// Turn a non-success response into `MarketplaceError::Status`.
async fn status_error(response: reqwest::Response) -> MarketplaceError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut cut = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    MarketplaceError::Status { status, body }
}

/// Read a success response and decode it as `T`.
async fn decode_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, MarketplaceError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| MarketplaceError::Decode(e.to_string()))
}
