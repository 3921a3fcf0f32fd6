//! Mapping routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use marketlink_core::{MappingDetail, MappingId, ProductId, ProductMapping};

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMappingRequest {
    pub product1_id: ProductId,
    pub product2_id: ProductId,
}

#[derive(Debug, Serialize)]
pub struct MappingsResponse {
    pub mappings: Vec<MappingDetail>,
}

/// GET /api/mappings
///
/// # Errors
///
/// Returns `AppError::Database` if the mappings cannot be listed.
pub async fn index(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<MappingsResponse>, AppError> {
    let mappings = state.mappings().get_mappings_by_user(user_id).await?;
    Ok(Json(MappingsResponse { mappings }))
}

/// Link two of the caller's saved products.
///
/// POST /api/mappings
///
/// # Errors
///
/// Returns `Validation`, `NotFound`, `Forbidden` or `Conflict` as decided by
/// the mapping engine.
pub async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<CreateMappingRequest>,
) -> Result<(StatusCode, Json<ProductMapping>), AppError> {
    let mapping = state
        .mappings()
        .create_mapping(request.product1_id, request.product2_id, user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(mapping)))
}

/// DELETE /api/mappings/{id}
///
/// # Errors
///
/// Returns `AppError::NotFound` if the mapping is missing or not the caller's.
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(mapping_id): Path<MappingId>,
) -> Result<StatusCode, AppError> {
    state.mappings().delete_mapping(mapping_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
