//! Wildberries content API client.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketlink_core::{MarketplaceProduct, StoreType};

use super::{MarketplaceError, decode_body, status_error};

/// Card listing path under the content API base URL.
const CARDS_LIST_PATH: &str = "/content/v2/cards/list";

/// Cards requested per call.
const PAGE_LIMIT: u32 = 1000;

/// Wildberries client for one store.
#[derive(Debug, Clone)]
pub struct WildberriesClient {
    http: reqwest::Client,
    endpoint: String,
    token: SecretString,
}

#[derive(Debug, Serialize)]
struct CardsListRequest {
    sort: CardsSort,
    filter: CardsFilter,
    offset: u32,
    limit: u32,
}

#[derive(Debug, Serialize)]
struct CardsSort {
    ascending: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CardsFilter {
    text: String,
    tag_ids: Vec<i64>,
}

impl Default for CardsListRequest {
    fn default() -> Self {
        Self {
            sort: CardsSort { ascending: true },
            filter: CardsFilter {
                text: String::new(),
                tag_ids: Vec::new(),
            },
            offset: 0,
            limit: PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CardsListResponse {
    #[serde(default)]
    data: Vec<Card>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Card {
    #[serde(default)]
    nm_id: Option<NmId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<i64>,
    #[serde(default)]
    quantity: Option<i64>,
}

/// `nmId` is documented as a number but some accounts return it as text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NmId {
    Number(i64),
    Text(String),
}

impl NmId {
    /// The id as text, or empty when the card has none.
    fn into_external_id(self) -> String {
        match self {
            Self::Number(0) => String::new(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => match s.trim() {
                "0" => String::new(),
                id => id.to_string(),
            },
        }
    }
}

impl WildberriesClient {
    /// Create a client against `base_url` (no trailing slash).
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str, token: SecretString) -> Self {
        Self {
            http,
            endpoint: format!("{base_url}{CARDS_LIST_PATH}"),
            token,
        }
    }

    /// Fetch the first page of product cards.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::Configuration` if the token is empty,
    /// `Status` on a non-200 response, `Http` on transport failure and
    /// `Decode` if the body is not a card listing.
    #[instrument(skip(self), fields(marketplace = "wb"))]
    pub async fn get_products(&self) -> Result<Vec<MarketplaceProduct>, MarketplaceError> {
        let token = self.token.expose_secret();
        if token.trim().is_empty() {
            return Err(MarketplaceError::Configuration(
                "Wildberries API token is not set".to_string(),
            ));
        }

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", token)
            .json(&CardsListRequest::default())
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(status_error(response).await);
        }

        let listing: CardsListResponse = decode_body(response).await?;
        let products = normalize_cards(listing.data);
        tracing::debug!(count = products.len(), "Fetched Wildberries cards");
        Ok(products)
    }
}

fn normalize_cards(cards: Vec<Card>) -> Vec<MarketplaceProduct> {
    cards
        .into_iter()
        .filter_map(|card| {
            MarketplaceProduct::normalize(
                StoreType::Wildberries,
                card.nm_id.map(NmId::into_external_id).unwrap_or_default(),
                card.name.unwrap_or_default(),
                card.price.unwrap_or(0),
                card.quantity.unwrap_or(0),
            )
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marketlink_core::UNKNOWN_PRODUCT_NAME;

    fn parse(json: &str) -> Vec<MarketplaceProduct> {
        let listing: CardsListResponse = serde_json::from_str(json).unwrap();
        normalize_cards(listing.data)
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(CardsListRequest::default()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "sort": {"ascending": true},
                "filter": {"text": "", "tagIds": []},
                "offset": 0,
                "limit": 1000
            })
        );
    }

    #[test]
    fn test_cards_without_id_are_dropped() {
        let products = parse(
            r#"{"data": [
                {"nmId": "", "name": "Ghost", "price": 10, "quantity": 1},
                {"nmId": 0, "name": "Ghost", "price": 10, "quantity": 1},
                {"nmId": " 0 ", "name": "Ghost", "price": 10, "quantity": 1},
                {"name": "Ghost", "price": 10, "quantity": 1},
                {"nmId": 123456, "name": "Scarf", "price": 1990, "quantity": 4}
            ], "error": false}"#,
        );
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].external_id, "123456");
    }

    #[test]
    fn test_numeric_and_text_ids() {
        let products = parse(
            r#"{"data": [
                {"nmId": "A-77", "name": "Hat", "price": 500, "quantity": 2},
                {"nmId": 78, "name": "Hat", "price": 500, "quantity": 2}
            ]}"#,
        );
        let ids: Vec<&str> = products.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(ids, ["A-77", "78"]);
    }

    #[test]
    fn test_negative_values_clamp_and_blank_name() {
        let products = parse(r#"{"data": [{"nmId": 5, "name": "", "price": -10, "quantity": -2}]}"#);
        assert_eq!(products[0].price, 0);
        assert_eq!(products[0].quantity, 0);
        assert_eq!(products[0].name, UNKNOWN_PRODUCT_NAME);
        assert_eq!(products[0].store_type, StoreType::Wildberries);
    }

    #[test]
    fn test_null_numbers_read_as_zero() {
        let products = parse(
            r#"{"data": [
                {"nmId": 5, "name": "Mitten", "price": null, "quantity": null},
                {"nmId": 6, "name": "Glove", "price": 10, "quantity": 3}
            ]}"#,
        );
        assert_eq!(products.len(), 2);
        assert_eq!((products[0].price, products[0].quantity), (0, 0));
        assert_eq!((products[1].price, products[1].quantity), (10, 3));
    }

    #[test]
    fn test_missing_data_is_empty() {
        assert!(parse(r#"{"error": false, "message": ""}"#).is_empty());
    }

    #[tokio::test]
    async fn test_empty_token_is_configuration_error() {
        let client = WildberriesClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            SecretString::from(""),
        );
        let err = client.get_products().await.unwrap_err();
        assert!(matches!(err, MarketplaceError::Configuration(_)));
    }
}
