//! Product routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use marketlink_core::{LiveProduct, MarketplaceProduct, ProductId, SavedProduct, StoreId, StoreType};

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LiveProductsResponse {
    pub products: Vec<LiveProduct>,
}

#[derive(Debug, Serialize)]
pub struct SavedProductsResponse {
    pub products: Vec<SavedProduct>,
}

/// A live product the caller wants to keep.
///
/// Same shape as an entry of `GET /api/products`.
#[derive(Debug, Deserialize)]
pub struct SaveProductRequest {
    pub store_id: StoreId,
    pub external_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub quantity: i64,
    pub store_type: StoreType,
}

/// Live products from every store the caller owns.
///
/// GET /api/products
///
/// Stores that fail are left out of the result.
///
/// # Errors
///
/// Returns `AppError::Database` if the caller's stores cannot be listed.
pub async fn live(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<LiveProductsResponse>, AppError> {
    let products = state.products().get_live_products_for_user(user_id).await?;
    Ok(Json(LiveProductsResponse { products }))
}

/// GET /api/products/saved
///
/// # Errors
///
/// Returns `AppError::Database` if a query fails.
pub async fn saved(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<SavedProductsResponse>, AppError> {
    let products = state.products().get_saved_products(user_id).await?;
    Ok(Json(SavedProductsResponse { products }))
}

/// Save a single product under one of the caller's stores.
///
/// POST /api/products/saved
///
/// # Errors
///
/// Returns `AppError::Validation` for a record without an external id or
/// from the wrong provider, and `AppError::NotFound` for a foreign store.
pub async fn save(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<SaveProductRequest>,
) -> Result<(StatusCode, Json<SavedProduct>), AppError> {
    let product = MarketplaceProduct::normalize(
        request.store_type,
        request.external_id,
        request.name,
        request.price,
        request.quantity,
    )
    .ok_or_else(|| AppError::Validation("external_id is required".to_string()))?;

    let saved = state
        .products()
        .save_product(user_id, request.store_id, &product)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// DELETE /api/products/{id}
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is missing or not the caller's.
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode, AppError> {
    state
        .products()
        .delete_saved_product(product_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
