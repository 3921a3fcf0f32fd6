//! Normalized product shapes.
//!
//! Every provider's native listing is reduced to the same fields: an
//! external id, a name, a non-negative price in minor currency units and a
//! non-negative stock quantity.
//!
//! - [`MarketplaceProduct`] is what a marketplace client returns.
//! - [`LiveProduct`] is a marketplace product tagged with the store it came
//!   from; it is produced per request and never persisted by the aggregator.
//! - [`SavedProduct`] is a persisted copy with its own database id. Only saved
//!   products can take part in mappings.

use serde::{Deserialize, Serialize};

use super::id::{ProductId, StoreId};
use super::store::StoreType;

/// Name used when a provider returns a listing without one.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown product";

/// Name shown for a mapped product that could not be read back.
pub const FAILED_TO_LOAD_PRODUCT_NAME: &str = "Failed to load product";

/// A provider listing after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceProduct {
    /// Provider-native identifier, unique within the provider.
    pub external_id: String,
    pub name: String,
    /// Minor currency units, never negative.
    pub price: i64,
    /// Never negative.
    pub quantity: i64,
    /// Provider that produced this record.
    pub store_type: StoreType,
}

impl MarketplaceProduct {
    /// Apply the shared normalization rules to one provider record.
    ///
    /// Returns `None` for a record without a native id; such records are
    /// dropped rather than reported. Negative price and quantity clamp to
    /// zero and an empty name becomes [`UNKNOWN_PRODUCT_NAME`].
    #[must_use]
    pub fn normalize(
        store_type: StoreType,
        external_id: String,
        name: String,
        price: i64,
        quantity: i64,
    ) -> Option<Self> {
        if external_id.is_empty() {
            return None;
        }

        let name = if name.is_empty() {
            UNKNOWN_PRODUCT_NAME.to_owned()
        } else {
            name
        };

        Some(Self {
            external_id,
            name,
            price: price.max(0),
            quantity: quantity.max(0),
            store_type,
        })
    }
}

/// A marketplace product fetched at request time, tagged with its store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveProduct {
    pub store_id: StoreId,
    #[serde(flatten)]
    pub product: MarketplaceProduct,
}

/// A persisted product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedProduct {
    pub id: ProductId,
    pub store_id: StoreId,
    pub external_id: String,
    pub name: String,
    pub price: i64,
    pub quantity: i64,
}

impl SavedProduct {
    /// Stand-in for a referenced product that could not be loaded.
    ///
    /// Keeps the original id so the caller can tell which side is missing.
    #[must_use]
    pub fn unavailable(id: ProductId) -> Self {
        Self {
            id,
            store_id: StoreId::new(0),
            external_id: String::new(),
            name: FAILED_TO_LOAD_PRODUCT_NAME.to_owned(),
            price: 0,
            quantity: 0,
        }
    }
}
