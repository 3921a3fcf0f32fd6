//! Business logic services.
//!
//! # Services
//!
//! - `stores` - Store registry and the encrypted credential boundary
//! - `products` - Live product aggregation and saved products
//! - `mappings` - Cross-marketplace product mappings
//!
//! Services return `AppError` directly; route handlers only translate
//! requests and responses.

pub mod mappings;
pub mod products;
pub mod stores;

pub use mappings::MappingEngine;
pub use products::ProductAggregator;
pub use stores::{MIN_API_TOKEN_LEN, StoreRegistry};
