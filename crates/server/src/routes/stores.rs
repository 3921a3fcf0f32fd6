//! Store routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use marketlink_core::{SavedProduct, Store, StoreId};

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Request to link a marketplace account.
#[derive(Deserialize)]
pub struct AddStoreRequest {
    /// Store type code (`wb` or `ozon`).
    #[serde(rename = "type")]
    pub store_type: String,
    pub api_token: String,
}

impl std::fmt::Debug for AddStoreRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddStoreRequest")
            .field("store_type", &self.store_type)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub struct StoresResponse {
    pub stores: Vec<Store>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub products: Vec<SavedProduct>,
}

/// List the caller's stores.
///
/// GET /api/stores
///
/// # Errors
///
/// Returns `AppError::Database` if the stores cannot be listed.
pub async fn index(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<StoresResponse>, AppError> {
    let stores = state.stores().list_stores(user_id).await?;
    Ok(Json(StoresResponse { stores }))
}

/// Link a new store. The token is encrypted before it is stored and never
/// returned.
///
/// POST /api/stores
///
/// # Errors
///
/// Returns `AppError::Validation` for an unknown type or a short token.
pub async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<AddStoreRequest>,
) -> Result<(StatusCode, Json<Store>), AppError> {
    let api_token = SecretString::from(request.api_token);
    let store = state
        .stores()
        .add_store(user_id, &request.store_type, &api_token)
        .await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// Unlink a store along with its saved products and their mappings.
///
/// DELETE /api/stores/{id}
///
/// # Errors
///
/// Returns `AppError::Forbidden` if the store is not the caller's.
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(store_id): Path<StoreId>,
) -> Result<StatusCode, AppError> {
    state.stores().delete_store(store_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch one store's live products and save them.
///
/// POST /api/stores/{id}/sync
///
/// # Errors
///
/// Returns `AppError::NotFound` for a foreign store and `AppError::Upstream`
/// if the marketplace call fails.
pub async fn sync(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(store_id): Path<StoreId>,
) -> Result<Json<SyncResponse>, AppError> {
    let products = state.products().sync_store(store_id, user_id).await?;
    Ok(Json(SyncResponse { products }))
}
