//! User-asserted links between two saved products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MappingId, ProductId, UserId};
use super::product::SavedProduct;

/// A link between two saved products owned by the same user.
///
/// The pair is unordered: `(a, b)` and `(b, a)` are the same mapping and at
/// most one of them may exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMapping {
    pub id: MappingId,
    pub product1_id: ProductId,
    pub product2_id: ProductId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl ProductMapping {
    /// The pair in canonical `(min, max)` order.
    #[must_use]
    pub fn canonical_pair(&self) -> (ProductId, ProductId) {
        canonical_pair(self.product1_id, self.product2_id)
    }
}

/// Order a product pair so that equal unordered pairs compare equal.
#[must_use]
pub fn canonical_pair(a: ProductId, b: ProductId) -> (ProductId, ProductId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// A mapping with both sides resolved to full product detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDetail {
    pub id: MappingId,
    pub product1: SavedProduct,
    pub product2: SavedProduct,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pair_is_order_independent() {
        let a = ProductId::new(8);
        let b = ProductId::new(3);
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
        assert_eq!(canonical_pair(a, b), (b, a));
    }
}
