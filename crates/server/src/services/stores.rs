//! Store registry: a user's linked marketplace accounts.
//!
//! API tokens are encrypted before they reach the repository and are only
//! decrypted through [`StoreRegistry::get_decrypted_token`], which scopes the
//! lookup by both store id and owner.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use marketlink_core::{Store, StoreId, StoreType, UserId};

use crate::crypto::CredentialCipher;
use crate::db::StoreRepository;
use crate::error::AppError;

/// Shortest API token accepted when linking a store.
pub const MIN_API_TOKEN_LEN: usize = 10;

/// CRUD over linked stores plus the credential boundary.
#[derive(Clone)]
pub struct StoreRegistry {
    stores: Arc<dyn StoreRepository>,
    cipher: CredentialCipher,
}

impl StoreRegistry {
    #[must_use]
    pub fn new(stores: Arc<dyn StoreRepository>, cipher: CredentialCipher) -> Self {
        Self { stores, cipher }
    }

    /// Link a new marketplace account.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a non-positive user id, an unknown
    /// store type, or a blank or too-short token. Returns `AppError::Crypto`
    /// if the token cannot be encrypted.
    #[instrument(skip(self, api_token), fields(user_id = %user_id, store_type = %store_type))]
    pub async fn add_store(
        &self,
        user_id: UserId,
        store_type: &str,
        api_token: &SecretString,
    ) -> Result<Store, AppError> {
        if !user_id.is_positive() {
            return Err(AppError::Validation("user id must be positive".to_string()));
        }

        let kind: StoreType = store_type
            .parse()
            .map_err(|e: marketlink_core::UnknownStoreType| AppError::Validation(e.to_string()))?;

        let token = api_token.expose_secret();
        if token.trim().is_empty() {
            return Err(AppError::Validation("API token cannot be empty".to_string()));
        }
        if token.chars().count() < MIN_API_TOKEN_LEN {
            return Err(AppError::Validation(format!(
                "API token is too short, minimum length is {MIN_API_TOKEN_LEN} characters"
            )));
        }

        let encrypted = self.cipher.encrypt(token)?;
        let store = self.stores.create(user_id, kind, &encrypted).await?;

        info!(store_id = %store.id, "Store linked");
        Ok(store)
    }

    /// A user's stores in registration order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_stores(&self, user_id: UserId) -> Result<Vec<Store>, AppError> {
        Ok(self.stores.list_by_user(user_id).await?)
    }

    /// Decrypt the token of a store owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no store matches both the id and the
    /// owner, and `AppError::Crypto` if the stored value does not decrypt.
    pub async fn get_decrypted_token(
        &self,
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<SecretString, AppError> {
        let encrypted = self
            .stores
            .get_encrypted_token(store_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("store not found or does not belong to user".to_string())
            })?;

        let token = self.cipher.decrypt(&encrypted)?;
        Ok(SecretString::from(token))
    }

    /// Unlink a store owned by `user_id`, along with its saved products.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if nothing was deleted.
    #[instrument(skip(self), fields(store_id = %store_id, user_id = %user_id))]
    pub async fn delete_store(&self, store_id: StoreId, user_id: UserId) -> Result<(), AppError> {
        if !self.stores.delete(store_id, user_id).await? {
            return Err(AppError::Forbidden(
                "store not found or does not belong to user".to_string(),
            ));
        }

        info!("Store deleted");
        Ok(())
    }

    /// The owner of a store, if it exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn owner_of(&self, store_id: StoreId) -> Result<Option<UserId>, AppError> {
        Ok(self.stores.get_owner(store_id).await?)
    }
}
