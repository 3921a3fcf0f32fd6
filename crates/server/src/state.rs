//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;

use crate::config::{MarketplaceConfig, ServerConfig};
use crate::crypto::CredentialCipher;
use crate::db::{
    MappingRepository, PgMappingRepository, PgProductRepository, PgStoreRepository,
    ProductRepository, StoreRepository,
};
use crate::marketplace::{MarketplaceClients, MarketplaceError};
use crate::middleware::ApiTokenSigner;
use crate::services::{MappingEngine, ProductAggregator, StoreRegistry};

/// Repository handles the services are built from.
#[derive(Clone)]
pub struct Repositories {
    pub stores: Arc<dyn StoreRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub mappings: Arc<dyn MappingRepository>,
}

impl Repositories {
    /// `PostgreSQL` repositories over one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            stores: Arc::new(PgStoreRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            mappings: Arc::new(PgMappingRepository::new(pool.clone())),
        }
    }

    /// In-memory repositories sharing one set of tables.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn memory(db: &crate::db::memory::MemoryDatabase) -> Self {
        Self {
            stores: Arc::new(db.clone()),
            products: Arc::new(db.clone()),
            mappings: Arc::new(db.clone()),
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: Option<PgPool>,
    registry: StoreRegistry,
    aggregator: ProductAggregator,
    mappings: MappingEngine,
    token_signer: ApiTokenSigner,
}

impl AppState {
    /// Build the production state over a `PostgreSQL` pool.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::Http` if the marketplace HTTP client cannot
    /// be built.
    pub fn new(config: &ServerConfig, pool: PgPool) -> Result<Self, MarketplaceError> {
        let repositories = Repositories::postgres(&pool);
        Self::build(
            repositories,
            &config.encryption_key,
            config.marketplace.clone(),
            config.api_token_secret.clone(),
            Some(pool),
        )
    }

    /// Build state from explicit parts. `pool` is only used for readiness.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::Http` if the marketplace HTTP client cannot
    /// be built.
    pub fn build(
        repositories: Repositories,
        encryption_key: &SecretString,
        marketplace: MarketplaceConfig,
        api_token_secret: SecretString,
        pool: Option<PgPool>,
    ) -> Result<Self, MarketplaceError> {
        let clients = MarketplaceClients::new(marketplace)?;
        let registry =
            StoreRegistry::new(repositories.stores, CredentialCipher::new(encryption_key));
        let aggregator =
            ProductAggregator::new(registry.clone(), repositories.products.clone(), clients);
        let mappings = MappingEngine::new(
            registry.clone(),
            repositories.products,
            repositories.mappings,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                pool,
                registry,
                aggregator,
                mappings,
                token_signer: ApiTokenSigner::new(api_token_secret),
            }),
        })
    }

    /// Database pool, absent when running over in-memory repositories.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn stores(&self) -> &StoreRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn products(&self) -> &ProductAggregator {
        &self.inner.aggregator
    }

    #[must_use]
    pub fn mappings(&self) -> &MappingEngine {
        &self.inner.mappings
    }

    #[must_use]
    pub fn token_signer(&self) -> &ApiTokenSigner {
        &self.inner.token_signer
    }
}
