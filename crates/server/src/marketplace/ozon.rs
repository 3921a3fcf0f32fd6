//! Ozon seller API client.
//!
//! Ozon authenticates with two headers: the seller's `Client-Id` and the
//! store's `Api-Key`. Prices arrive as text such as `"1 299.00"`.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketlink_core::{MarketplaceProduct, StoreType};

use super::{MarketplaceError, decode_body, status_error};

/// Product listing path under the seller API base URL.
const PRODUCT_LIST_PATH: &str = "/v2/product/list";

/// Items requested per call.
const PAGE_LIMIT: u32 = 100;

/// Ozon client for one store.
#[derive(Debug, Clone)]
pub struct OzonClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    client_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProductListRequest {
    filter: ProductFilter,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Serialize)]
struct ProductFilter {
    offer_id: Vec<String>,
    product_id: Vec<i64>,
    visibility: &'static str,
}

impl Default for ProductListRequest {
    fn default() -> Self {
        Self {
            filter: ProductFilter {
                offer_id: Vec::new(),
                product_id: Vec::new(),
                visibility: "ALL",
            },
            limit: PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductListResponse {
    result: ProductListResult,
}

#[derive(Debug, Deserialize)]
struct ProductListResult {
    #[serde(default)]
    items: Vec<ProductItem>,
}

#[derive(Debug, Deserialize)]
struct ProductItem {
    #[serde(default)]
    product_id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    stock: Option<i64>,
}

impl OzonClient {
    /// Create a client against `base_url` (no trailing slash).
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: SecretString,
        client_id: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{base_url}{PRODUCT_LIST_PATH}"),
            api_key,
            client_id,
        }
    }

    /// Fetch the first page of products.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::Configuration` if the API key or client id
    /// is missing, `Status` on a non-200 response, `Http` on transport
    /// failure and `Decode` if the body is not a product listing.
    #[instrument(skip(self), fields(marketplace = "ozon"))]
    pub async fn get_products(&self) -> Result<Vec<MarketplaceProduct>, MarketplaceError> {
        let api_key = self.api_key.expose_secret();
        if api_key.trim().is_empty() {
            return Err(MarketplaceError::Configuration(
                "Ozon API key is not set".to_string(),
            ));
        }
        let Some(client_id) = self.client_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            return Err(MarketplaceError::Configuration(
                "Ozon client id is not set (OZON_CLIENT_ID)".to_string(),
            ));
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("Client-Id", client_id)
            .header("Api-Key", api_key)
            .json(&ProductListRequest::default())
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(status_error(response).await);
        }

        let listing: ProductListResponse = decode_body(response).await?;
        let products = normalize_items(listing.result.items);
        tracing::debug!(count = products.len(), "Fetched Ozon products");
        Ok(products)
    }
}

fn normalize_items(items: Vec<ProductItem>) -> Vec<MarketplaceProduct> {
    items
        .into_iter()
        .filter_map(|item| {
            let product_id = item.product_id.filter(|&id| id != 0)?;
            MarketplaceProduct::normalize(
                StoreType::Ozon,
                product_id.to_string(),
                item.name.unwrap_or_default(),
                item.price.as_deref().map_or(0, parse_price),
                item.stock.unwrap_or(0),
            )
        })
        .collect()
}

/// Parse Ozon's textual price into whole currency units.
///
/// Whitespace is removed (prices may be formatted as `"1 299.50"`), the rest
/// is read as a decimal and truncated toward zero. Text that is not a number
/// yields 0 so one bad field never fails the listing.
fn parse_price(raw: &str) -> i64 {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return 0;
    }

    Decimal::from_str(&compact)
        .or_else(|_| Decimal::from_scientific(&compact))
        .ok()
        .and_then(|price| price.trunc().to_i64())
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marketlink_core::UNKNOWN_PRODUCT_NAME;

    fn parse(json: &str) -> Vec<MarketplaceProduct> {
        let listing: ProductListResponse = serde_json::from_str(json).unwrap();
        normalize_items(listing.result.items)
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ProductListRequest::default()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "filter": {"offer_id": [], "product_id": [], "visibility": "ALL"},
                "limit": 100,
                "offset": 0
            })
        );
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1299"), 1299);
        assert_eq!(parse_price("1299.99"), 1299);
        assert_eq!(parse_price(" 1 299.50\t"), 1299);
        assert_eq!(parse_price("1\u{a0}050"), 1050);
        assert_eq!(parse_price("1.5e3"), 1500);
        assert_eq!(parse_price("-12.7"), -12);
        assert_eq!(parse_price(""), 0);
        assert_eq!(parse_price("free"), 0);
        assert_eq!(parse_price("12,50"), 0);
    }

    #[test]
    fn test_zero_product_id_is_dropped() {
        let products = parse(
            r#"{"result": {"items": [
                {"product_id": 0, "name": "Ghost", "price": "10", "stock": 1, "offer_id": "g"},
                {"product_id": 9001, "name": "Kettle", "price": "2 490.00", "stock": 3, "offer_id": "k-1"}
            ], "total": 2}}"#,
        );
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].external_id, "9001");
        assert_eq!(products[0].price, 2490);
        assert_eq!(products[0].quantity, 3);
        assert_eq!(products[0].store_type, StoreType::Ozon);
    }

    #[test]
    fn test_null_fields_read_as_zero() {
        let products = parse(
            r#"{"result": {"items": [
                {"product_id": null, "name": "Ghost", "price": "10", "stock": 1},
                {"product_id": 41, "name": "Pan", "price": null, "stock": null},
                {"product_id": 42, "name": "Lid", "price": "300", "stock": 2}
            ]}}"#,
        );
        let ids: Vec<&str> = products.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(ids, ["41", "42"]);
        assert_eq!((products[0].price, products[0].quantity), (0, 0));
        assert_eq!((products[1].price, products[1].quantity), (300, 2));
    }

    #[test]
    fn test_bad_price_negative_stock_and_blank_name() {
        let products = parse(
            r#"{"result": {"items": [
                {"product_id": 12, "name": "", "price": "n/a", "stock": -4, "offer_id": "x"},
                {"product_id": 13, "name": "Cup", "price": "-5", "stock": 1}
            ]}}"#,
        );
        assert_eq!(products[0].price, 0);
        assert_eq!(products[0].quantity, 0);
        assert_eq!(products[0].name, UNKNOWN_PRODUCT_NAME);
        assert_eq!(products[1].price, 0);
    }

    #[tokio::test]
    async fn test_missing_client_id_is_configuration_error() {
        let client = OzonClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            SecretString::from("tok1234567"),
            None,
        );
        let err = client.get_products().await.unwrap_err();
        assert!(matches!(err, MarketplaceError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_configuration_error() {
        let client = OzonClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            SecretString::from("  "),
            Some("12345".to_string()),
        );
        let err = client.get_products().await.unwrap_err();
        assert!(matches!(err, MarketplaceError::Configuration(_)));
    }
}
