//! Linked marketplace accounts ("stores").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{StoreId, UserId};

/// Marketplace provider behind a store.
///
/// The set is closed: adding a provider means adding a variant and a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreType {
    /// Wildberries (token only, integer prices).
    #[serde(rename = "wb")]
    Wildberries,
    /// Ozon (token plus client id, textual prices).
    #[serde(rename = "ozon")]
    Ozon,
}

impl StoreType {
    /// Wire and storage code for this provider.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Wildberries => "wb",
            Self::Ozon => "ozon",
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A store type code that no client exists for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported store type: {0}")]
pub struct UnknownStoreType(pub String);

impl std::str::FromStr for StoreType {
    type Err = UnknownStoreType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wb" => Ok(Self::Wildberries),
            "ozon" => Ok(Self::Ozon),
            other => Err(UnknownStoreType(other.to_owned())),
        }
    }
}

/// A user's linked marketplace account.
///
/// The access token is deliberately absent; it only ever leaves storage
/// through the store registry's decrypting accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub user_id: UserId,
    /// Provider code as stored. Rows written by a newer release may carry a
    /// code this build has no client for, so it stays textual here.
    #[serde(rename = "type")]
    pub store_type: String,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Resolve the provider for this store.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStoreType` if the stored code is not a known provider.
    pub fn kind(&self) -> Result<StoreType, UnknownStoreType> {
        self.store_type.parse()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_parse_back() {
        for kind in [StoreType::Wildberries, StoreType::Ozon] {
            assert_eq!(kind.code().parse::<StoreType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_code() {
        let err = "yandex".parse::<StoreType>().unwrap_err();
        assert_eq!(err, UnknownStoreType("yandex".to_owned()));
        assert!("WB".parse::<StoreType>().is_err());
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&StoreType::Ozon).unwrap(), "\"ozon\"");
        let kind: StoreType = serde_json::from_str("\"wb\"").unwrap();
        assert_eq!(kind, StoreType::Wildberries);
    }

    #[test]
    fn test_store_kind() {
        let mut store = Store {
            id: StoreId::new(1),
            user_id: UserId::new(2),
            store_type: "wb".to_owned(),
            created_at: Utc::now(),
        };
        assert_eq!(store.kind().unwrap(), StoreType::Wildberries);

        store.store_type = "megamarket".to_owned();
        assert!(store.kind().is_err());
    }
}
