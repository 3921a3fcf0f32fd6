//! Mapping engine: user-asserted links between saved products.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use marketlink_core::{
    MappingDetail, MappingId, ProductId, ProductMapping, SavedProduct, UserId,
};

use crate::db::{MappingRepository, ProductRepository};
use crate::error::AppError;

use super::StoreRegistry;

/// Validates, creates, lists and deletes product mappings.
#[derive(Clone)]
pub struct MappingEngine {
    registry: StoreRegistry,
    products: Arc<dyn ProductRepository>,
    mappings: Arc<dyn MappingRepository>,
}

impl MappingEngine {
    #[must_use]
    pub fn new(
        registry: StoreRegistry,
        products: Arc<dyn ProductRepository>,
        mappings: Arc<dyn MappingRepository>,
    ) -> Self {
        Self {
            registry,
            products,
            mappings,
        }
    }

    /// Link two saved products owned by `user_id`.
    ///
    /// Checks run in order and the first failure is returned: positive ids,
    /// distinct products, both products exist, both belong to the user, and
    /// the unordered pair is not already mapped.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `NotFound`, `Forbidden` or `Conflict` for the
    /// checks above. A concurrent insert of the same pair that slips past the
    /// pre-check is reported as `Conflict` by the storage constraint.
    #[instrument(skip(self), fields(product1_id = %product1_id, product2_id = %product2_id, user_id = %user_id))]
    pub async fn create_mapping(
        &self,
        product1_id: ProductId,
        product2_id: ProductId,
        user_id: UserId,
    ) -> Result<ProductMapping, AppError> {
        if !product1_id.is_positive() || !product2_id.is_positive() || !user_id.is_positive() {
            return Err(AppError::Validation(
                "product and user ids must be positive".to_string(),
            ));
        }
        if product1_id == product2_id {
            return Err(AppError::Validation(
                "cannot map a product to itself".to_string(),
            ));
        }

        let product1 = self.require_product(product1_id).await?;
        let product2 = self.require_product(product2_id).await?;

        let owner1 = self.registry.owner_of(product1.store_id).await?;
        let owner2 = self.registry.owner_of(product2.store_id).await?;
        if owner1 != Some(user_id) || owner2 != Some(user_id) {
            return Err(AppError::Forbidden(
                "cannot map products you do not own".to_string(),
            ));
        }

        if self.mappings.pair_exists(product1_id, product2_id).await? {
            return Err(AppError::Conflict(
                "mapping between these products already exists".to_string(),
            ));
        }

        let mapping = self
            .mappings
            .create(product1_id, product2_id, user_id)
            .await?;

        info!(mapping_id = %mapping.id, "Mapping created");
        Ok(mapping)
    }

    /// The user's mappings, newest first, with both products resolved.
    ///
    /// A product that cannot be loaded is replaced by
    /// [`SavedProduct::unavailable`] instead of failing the listing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the mappings themselves cannot be listed.
    pub async fn get_mappings_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MappingDetail>, AppError> {
        let mappings = self.mappings.list_by_user(user_id).await?;

        let mut details = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let product1 = self.load_or_placeholder(mapping.id, mapping.product1_id).await;
            let product2 = self.load_or_placeholder(mapping.id, mapping.product2_id).await;
            details.push(MappingDetail {
                id: mapping.id,
                product1,
                product2,
                user_id: mapping.user_id,
                created_at: mapping.created_at,
            });
        }

        Ok(details)
    }

    /// Delete a mapping owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` both when the mapping does not exist and
    /// when it belongs to another user.
    #[instrument(skip(self), fields(mapping_id = %mapping_id, user_id = %user_id))]
    pub async fn delete_mapping(
        &self,
        mapping_id: MappingId,
        user_id: UserId,
    ) -> Result<(), AppError> {
        if !self.mappings.delete(mapping_id, user_id).await? {
            return Err(AppError::NotFound(
                "mapping not found or does not belong to user".to_string(),
            ));
        }

        info!("Mapping deleted");
        Ok(())
    }

    async fn require_product(&self, id: ProductId) -> Result<SavedProduct, AppError> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product with id {id} not found")))
    }

    async fn load_or_placeholder(&self, mapping_id: MappingId, id: ProductId) -> SavedProduct {
        match self.products.get_by_id(id).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                warn!(mapping_id = %mapping_id, product_id = %id, "Mapped product is missing");
                SavedProduct::unavailable(id)
            }
            Err(e) => {
                warn!(
                    mapping_id = %mapping_id,
                    product_id = %id,
                    error = %e,
                    "Failed to load mapped product"
                );
                SavedProduct::unavailable(id)
            }
        }
    }
}
