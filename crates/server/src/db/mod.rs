//! Persistence for users, stores, saved products and mappings.
//!
//! # Tables
//!
//! - `users` - Accounts (email unique, argon2 password hash)
//! - `stores` - Linked marketplace accounts with encrypted API tokens
//! - `products` - Saved product snapshots, unique per `(store_id, external_id)`
//! - `product_mappings` - Unordered product pairs, unique via a
//!   `LEAST`/`GREATEST` index
//!
//! Deleting a store cascades to its products, and deleting a product cascades
//! to the mappings that reference it.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p marketlink-cli -- migrate
//! ```
//!
//! # Implementations
//!
//! Every table is reached through a repository trait. The Postgres
//! implementations are used in production; [`memory::MemoryDatabase`]
//! implements all four traits for tests (feature `test-support`).

pub mod mappings;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod products;
pub mod stores;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use marketlink_core::{
    Email, MappingId, MarketplaceProduct, ProductId, ProductMapping, SavedProduct, Store, StoreId,
    StoreType, UserId,
};

pub use mappings::PgMappingRepository;
pub use products::PgProductRepository;
pub use stores::PgStoreRepository;
pub use users::{PgUserRepository, User};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate mapping pair).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint failure to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_or_database(e: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(conflict.to_string());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Repository traits
// =============================================================================

/// Account storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `Conflict` if the email is taken.
    async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;
}

/// Linked marketplace accounts and their encrypted tokens.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Insert a store. The token must already be encrypted.
    async fn create(
        &self,
        user_id: UserId,
        store_type: StoreType,
        encrypted_token: &str,
    ) -> Result<Store, RepositoryError>;

    /// A user's stores in registration order.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Store>, RepositoryError>;

    /// The stored token of a store, only if it belongs to `user_id`.
    async fn get_encrypted_token(
        &self,
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<Option<String>, RepositoryError>;

    /// The owner of a store, if the store exists.
    async fn get_owner(&self, store_id: StoreId) -> Result<Option<UserId>, RepositoryError>;

    /// Delete a store owned by `user_id`. Returns whether a row was removed.
    async fn delete(&self, store_id: StoreId, user_id: UserId) -> Result<bool, RepositoryError>;
}

/// Saved product snapshots.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert or refresh the row for `(store_id, product.external_id)`.
    async fn upsert(
        &self,
        store_id: StoreId,
        product: &MarketplaceProduct,
    ) -> Result<SavedProduct, RepositoryError>;

    async fn get_by_id(&self, id: ProductId) -> Result<Option<SavedProduct>, RepositoryError>;

    /// Saved products of the given stores, ordered by store then id.
    async fn list_by_stores(
        &self,
        store_ids: &[StoreId],
    ) -> Result<Vec<SavedProduct>, RepositoryError>;

    /// Delete a product whose store belongs to `user_id`. Returns whether a
    /// row was removed.
    async fn delete_owned(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError>;
}

/// Product mappings.
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Insert a mapping. Fails with `Conflict` if the unordered pair exists.
    async fn create(
        &self,
        product1_id: ProductId,
        product2_id: ProductId,
        user_id: UserId,
    ) -> Result<ProductMapping, RepositoryError>;

    /// Whether any mapping covers `{a, b}` in either order.
    async fn pair_exists(&self, a: ProductId, b: ProductId) -> Result<bool, RepositoryError>;

    /// A user's mappings, newest first.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ProductMapping>, RepositoryError>;

    /// Delete a mapping owned by `user_id`. Returns whether a row was removed.
    async fn delete(&self, mapping_id: MappingId, user_id: UserId)
    -> Result<bool, RepositoryError>;
}
