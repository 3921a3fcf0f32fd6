//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness check
//! GET    /health/ready           - Readiness check (database)
//!
//! # Stores (requires bearer token)
//! GET    /api/stores             - List linked stores
//! POST   /api/stores             - Link a store
//! DELETE /api/stores/{id}        - Unlink a store
//! POST   /api/stores/{id}/sync   - Save a store's live products
//!
//! # Products (requires bearer token)
//! GET    /api/products           - Live products across all stores
//! GET    /api/products/saved     - Saved products
//! POST   /api/products/saved     - Save one product
//! DELETE /api/products/{id}      - Delete a saved product
//!
//! # Mappings (requires bearer token)
//! GET    /api/mappings           - List mappings with product details
//! POST   /api/mappings           - Link two saved products
//! DELETE /api/mappings/{id}      - Delete a mapping
//! ```

pub mod mappings;
pub mod products;
pub mod stores;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index).post(stores::create))
        .route("/{id}", delete(stores::delete))
        .route("/{id}/sync", post(stores::sync))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::live))
        .route("/saved", get(products::saved).post(products::save))
        .route("/{id}", delete(products::delete))
}

/// Create the mapping routes router.
pub fn mapping_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(mappings::index).post(mappings::create))
        .route("/{id}", delete(mappings::delete))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/stores", store_routes())
        .nest("/api/products", product_routes())
        .nest("/api/mappings", mapping_routes())
}

/// The full application without the tracing and Sentry layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
