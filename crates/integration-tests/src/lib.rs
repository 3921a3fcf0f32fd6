//! Integration tests for Marketlink.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketlink-integration-tests
//! ```
//!
//! No database or network access is needed: repositories are in-memory and
//! both marketplaces are served by [`MockMarketplace`] on an ephemeral local
//! port.
//!
//! # Test Categories
//!
//! - `aggregation` - Live products across stores, partial failure, sync
//! - `mappings` - Mapping rules over synced products
//! - `api` - HTTP router, bearer auth and status codes

use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use marketlink_core::{Email, Store, UserId};
use marketlink_server::config::MarketplaceConfig;
use marketlink_server::db::UserRepository;
use marketlink_server::db::memory::MemoryDatabase;
use marketlink_server::routes;
use marketlink_server::state::{AppState, Repositories};

/// Wildberries token the mock answers with a card listing.
pub const WB_GOOD_TOKEN: &str = "wb-good-token";
/// Wildberries token the mock answers with a 500.
pub const WB_FAILING_TOKEN: &str = "wb-failing-token";
/// Wildberries token the mock answers after the client timeout has passed.
pub const WB_SLOW_TOKEN: &str = "wb-slow-token";
/// Wildberries token the mock answers with one card after a delay within the
/// client timeout.
pub const WB_LAGGING_TOKEN: &str = "wb-lagging-token";
/// Any other Wildberries token gets an empty listing.
pub const WB_EMPTY_TOKEN: &str = "tok1234567";

pub const OZON_GOOD_TOKEN: &str = "ozon-good-token";
pub const OZON_CLIENT_ID: &str = "client-1";

const ENCRYPTION_KEY: &str = "integration-encryption-key";
const TOKEN_SECRET: &str = "integration-token-secret-8c1f2a9d";
const CLIENT_TIMEOUT: Duration = Duration::from_millis(750);

/// Local stand-in for both marketplace APIs.
pub struct MockMarketplace {
    pub base_url: String,
}

impl MockMarketplace {
    /// Serve the mock on `127.0.0.1` with an OS-assigned port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/content/v2/cards/list", post(wildberries_cards))
            .route("/v2/product/list", post(ozon_products));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock marketplace");
        let addr = listener
            .local_addr()
            .expect("Mock marketplace has no address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
        }
    }
}

async fn wildberries_cards(headers: HeaderMap) -> Response {
    let token = headers.get("authorization").and_then(|v| v.to_str().ok());
    match token {
        Some(WB_GOOD_TOKEN) => Json(json!({
            "data": [
                {"nmId": 111, "name": "Blue mug", "price": 1500, "quantity": 4},
                {"nmId": "", "name": "Card without id", "price": 10, "quantity": 1},
                {"nmId": "222", "name": "", "price": -5, "quantity": -1}
            ],
            "error": false,
            "message": ""
        }))
        .into_response(),
        Some(WB_FAILING_TOKEN) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        Some(WB_LAGGING_TOKEN) => {
            tokio::time::sleep(CLIENT_TIMEOUT / 3).await;
            Json(json!({
                "data": [{"nmId": 333, "name": "Late kettle", "price": 2400, "quantity": 2}]
            }))
            .into_response()
        }
        Some(WB_SLOW_TOKEN) => {
            tokio::time::sleep(CLIENT_TIMEOUT * 4).await;
            Json(json!({"data": []})).into_response()
        }
        Some(_) => Json(json!({"data": [], "error": false, "message": ""})).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn ozon_products(headers: HeaderMap) -> Response {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if header("client-id") != Some(OZON_CLIENT_ID) || header("api-key") != Some(OZON_GOOD_TOKEN) {
        return (StatusCode::FORBIDDEN, r#"{"message":"bad credentials"}"#).into_response();
    }

    Json(json!({
        "result": {
            "items": [
                {"product_id": 9001, "name": "Red mug", "price": "1299.90", "stock": 7, "offer_id": "RM-1"},
                {"product_id": 0, "name": "Draft", "price": "10", "stock": 1, "offer_id": "D-1"}
            ],
            "total": 2
        }
    }))
    .into_response()
}

/// Application state over in-memory repositories and the mock marketplace.
pub struct TestContext {
    pub db: MemoryDatabase,
    pub state: AppState,
    pub marketplace: MockMarketplace,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_marketplace(|_| {}).await
    }

    /// Build a context after adjusting the marketplace configuration.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be built.
    pub async fn with_marketplace(adjust: impl FnOnce(&mut MarketplaceConfig)) -> Self {
        let marketplace = MockMarketplace::start().await;
        let mut config = MarketplaceConfig {
            wildberries_base_url: marketplace.base_url.clone(),
            ozon_base_url: marketplace.base_url.clone(),
            ozon_client_id: Some(OZON_CLIENT_ID.to_string()),
            timeout: CLIENT_TIMEOUT,
            concurrency: 4,
        };
        adjust(&mut config);

        let db = MemoryDatabase::new();
        let state = AppState::build(
            Repositories::memory(&db),
            &SecretString::from(ENCRYPTION_KEY),
            config,
            SecretString::from(TOKEN_SECRET),
            None,
        )
        .expect("Failed to build application state");

        Self {
            db,
            state,
            marketplace,
        }
    }

    /// Register a user.
    ///
    /// # Panics
    ///
    /// Panics if the email is invalid or already taken.
    pub async fn user(&self, email: &str) -> UserId {
        let email = Email::parse(email).expect("Invalid test email");
        UserRepository::create(&self.db, &email, "$argon2id$test")
            .await
            .expect("Failed to create user")
            .id
    }

    /// Link a store through the registry.
    ///
    /// # Panics
    ///
    /// Panics if the registry rejects the store.
    pub async fn store(&self, user_id: UserId, store_type: &str, token: &str) -> Store {
        self.state
            .stores()
            .add_store(user_id, store_type, &SecretString::from(token.to_string()))
            .await
            .expect("Failed to add store")
    }

    /// `Authorization` header value for `user_id`.
    ///
    /// # Panics
    ///
    /// Panics if the token cannot be signed.
    #[must_use]
    pub fn bearer(&self, user_id: UserId) -> String {
        let token = self
            .state
            .token_signer()
            .issue(user_id, chrono::Duration::hours(1))
            .expect("Failed to issue token");
        format!("Bearer {token}")
    }

    #[must_use]
    pub fn router(&self) -> Router {
        routes::app(self.state.clone())
    }

    /// Send one request through the router and decode the JSON body.
    ///
    /// An empty body decodes to `Value::Null` and a plain-text body to
    /// `Value::String`.
    ///
    /// # Panics
    ///
    /// Panics if the response body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router()
            .oneshot(request)
            .await
            .expect("Router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}

/// Build a request with an optional bearer header and JSON body.
///
/// # Panics
///
/// Panics if the request parts are invalid.
#[must_use]
pub fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", bearer);
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request")
}
