//! Product aggregation across a user's stores, plus the saved-product path.
//!
//! Live aggregation is best effort: a store whose token cannot be decrypted,
//! whose type this build has no client for, or whose marketplace call fails
//! is logged and left out. The remaining stores' products are returned in
//! store registration order.

use std::sync::Arc;

use futures::{StreamExt, stream};
use tracing::{debug, info, instrument, warn};

use marketlink_core::{
    LiveProduct, MarketplaceProduct, ProductId, SavedProduct, Store, StoreId, StoreType, UserId,
};

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::marketplace::MarketplaceClients;

use super::StoreRegistry;

/// Fetches live products from marketplaces and manages saved copies.
#[derive(Clone)]
pub struct ProductAggregator {
    registry: StoreRegistry,
    products: Arc<dyn ProductRepository>,
    clients: MarketplaceClients,
}

impl ProductAggregator {
    #[must_use]
    pub fn new(
        registry: StoreRegistry,
        products: Arc<dyn ProductRepository>,
        clients: MarketplaceClients,
    ) -> Self {
        Self {
            registry,
            products,
            clients,
        }
    }

    /// Live products from every store the user owns.
    ///
    /// Stores are fetched concurrently (bounded by the configured
    /// concurrency) and each call carries the client timeout. Per-store
    /// failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` only if the user's stores cannot be listed.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_live_products_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LiveProduct>, AppError> {
        let stores = self.registry.list_stores(user_id).await?;
        if stores.is_empty() {
            return Ok(Vec::new());
        }

        let store_count = stores.len();
        let per_store: Vec<Vec<LiveProduct>> = stream::iter(stores)
            .map(|store| async move {
                match self.fetch_store(&store).await {
                    Ok(products) => products,
                    Err(e) => {
                        warn!(
                            store_id = %store.id,
                            store_type = %store.store_type,
                            error = %e,
                            "Skipping store during aggregation"
                        );
                        Vec::new()
                    }
                }
            })
            .buffered(self.clients.concurrency())
            .collect()
            .await;

        let products: Vec<LiveProduct> = per_store.into_iter().flatten().collect();
        info!(stores = store_count, products = products.len(), "Aggregated live products");
        Ok(products)
    }

    /// Persisted products of every store the user owns. No network calls.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn get_saved_products(&self, user_id: UserId) -> Result<Vec<SavedProduct>, AppError> {
        let store_ids: Vec<StoreId> = self
            .registry
            .list_stores(user_id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        if store_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.products.list_by_stores(&store_ids).await?)
    }

    /// Persist one product under a store owned by `user_id`.
    ///
    /// An existing row with the same `(store_id, external_id)` is refreshed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the store does not belong to the user
    /// and `AppError::Validation` if the product came from another provider.
    #[instrument(skip(self, product), fields(user_id = %user_id, store_id = %store_id))]
    pub async fn save_product(
        &self,
        user_id: UserId,
        store_id: StoreId,
        product: &MarketplaceProduct,
    ) -> Result<SavedProduct, AppError> {
        let store = self.owned_store(store_id, user_id).await?;
        if store.kind().ok() != Some(product.store_type) {
            return Err(AppError::Validation(format!(
                "product from {} cannot be saved to a {} store",
                product.store_type, store.store_type
            )));
        }

        Ok(self.products.upsert(store_id, product).await?)
    }

    /// Fetch one store's live products and save them all.
    ///
    /// Unlike aggregation, failures are returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the store does not belong to the user,
    /// `AppError::Crypto` if its token does not decrypt, and the marketplace
    /// error (`Upstream` or `Configuration`) if the fetch fails.
    #[instrument(skip(self), fields(store_id = %store_id, user_id = %user_id))]
    pub async fn sync_store(
        &self,
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<Vec<SavedProduct>, AppError> {
        let store = self.owned_store(store_id, user_id).await?;
        let live = self.fetch_store(&store).await?;

        let mut saved = Vec::with_capacity(live.len());
        for item in &live {
            saved.push(self.products.upsert(store.id, &item.product).await?);
        }

        info!(products = saved.len(), "Store synced");
        Ok(saved)
    }

    /// Delete a saved product whose store belongs to `user_id`.
    ///
    /// Mappings that reference the product are removed with it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product does not exist or is not
    /// the user's.
    pub async fn delete_saved_product(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<(), AppError> {
        if !self.products.delete_owned(product_id, user_id).await? {
            return Err(AppError::NotFound(format!("product {product_id} not found")));
        }
        Ok(())
    }

    /// Look up a store by id among the user's own stores.
    async fn owned_store(&self, store_id: StoreId, user_id: UserId) -> Result<Store, AppError> {
        self.registry
            .list_stores(user_id)
            .await?
            .into_iter()
            .find(|s| s.id == store_id)
            .ok_or_else(|| {
                AppError::NotFound("store not found or does not belong to user".to_string())
            })
    }

    /// Decrypt the store's token and fetch its products from the marketplace.
    async fn fetch_store(&self, store: &Store) -> Result<Vec<LiveProduct>, AppError> {
        let kind: StoreType = store
            .kind()
            .map_err(|e| AppError::Configuration(e.to_string()))?;
        let token = self
            .registry
            .get_decrypted_token(store.id, store.user_id)
            .await?;

        let client = self.clients.for_store(kind, token);
        let products = client.get_products().await?;
        debug!(
            store_id = %store.id,
            store_type = %client.store_type(),
            count = products.len(),
            "Fetched store products"
        );
        Ok(products
            .into_iter()
            .map(|product| LiveProduct {
                store_id: store.id,
                product,
            })
            .collect())
    }
}
