//! Core types for Marketlink.
//!
//! This module provides type-safe wrappers for the domain concepts shared
//! between the server and the CLI.

pub mod email;
pub mod id;
pub mod mapping;
pub mod product;
pub mod store;

pub use email::{Email, EmailError};
pub use id::*;
pub use mapping::{MappingDetail, ProductMapping, canonical_pair};
pub use product::{
    FAILED_TO_LOAD_PRODUCT_NAME, LiveProduct, MarketplaceProduct, SavedProduct,
    UNKNOWN_PRODUCT_NAME,
};
pub use store::{Store, StoreType, UnknownStoreType};
