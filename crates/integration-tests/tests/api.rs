//! Integration tests for the HTTP API.
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use marketlink_integration_tests::{
    OZON_GOOD_TOKEN, TestContext, WB_FAILING_TOKEN, WB_GOOD_TOKEN, request,
};

fn id(value: &Value) -> i64 {
    value["id"].as_i64().unwrap()
}

// ============================================================================
// Health & auth
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new().await;

    let (status, _) = ctx.send(request("GET", "/health/ready", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.send(request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let ctx = TestContext::new().await;

    for uri in ["/api/stores", "/api/products", "/api/products/saved", "/api/mappings"] {
        let (status, body) = ctx.send(request("GET", uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }

    let (status, _) = ctx
        .send(request("GET", "/api/stores", Some("Bearer 1.9999999999.abcd"), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Stores
// ============================================================================

#[tokio::test]
async fn test_add_and_list_stores() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let bearer = ctx.bearer(user);

    let (status, store) = ctx
        .send(request(
            "POST",
            "/api/stores",
            Some(&bearer),
            Some(json!({"type": "wb", "api_token": WB_GOOD_TOKEN})),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(store["type"], "wb");
    assert_eq!(store["user_id"], user.as_i32());
    assert!(store.get("api_token").is_none());
    assert!(!store.to_string().contains(WB_GOOD_TOKEN));

    let (status, body) = ctx
        .send(request("GET", "/api/stores", Some(&bearer), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stores"].as_array().unwrap().len(), 1);
    assert_eq!(id(&body["stores"][0]), id(&store));
}

#[tokio::test]
async fn test_add_store_validation() {
    let ctx = TestContext::new().await;
    let bearer = ctx.bearer(ctx.user("seller@example.com").await);

    for payload in [
        json!({"type": "amazon", "api_token": "long-enough-token"}),
        json!({"type": "wb", "api_token": "short"}),
        json!({"type": "ozon", "api_token": "          "}),
    ] {
        let (status, body) = ctx
            .send(request("POST", "/api/stores", Some(&bearer), Some(payload.clone())))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_delete_foreign_store_is_forbidden() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("alice@example.com").await;
    let bob = ctx.user("bob@example.com").await;
    let store = ctx.store(alice, "wb", WB_GOOD_TOKEN).await;
    let uri = format!("/api/stores/{}", store.id);

    let (status, _) = ctx
        .send(request("DELETE", &uri, Some(&ctx.bearer(bob)), None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .send(request("DELETE", &uri, Some(&ctx.bearer(alice)), None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_live_products_and_sync() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let bearer = ctx.bearer(user);
    let store = ctx.store(user, "wb", WB_GOOD_TOKEN).await;

    let (status, body) = ctx
        .send(request("GET", "/api/products", Some(&bearer), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let live = body["products"].as_array().unwrap();
    assert_eq!(live.len(), 2);
    assert_eq!(live[0]["store_id"], store.id.as_i32());
    assert_eq!(live[0]["external_id"], "111");
    assert_eq!(live[0]["store_type"], "wb");

    let (status, body) = ctx
        .send(request(
            "POST",
            &format!("/api/stores/{}/sync", store.id),
            Some(&bearer),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"].as_array().unwrap().len(), 2);

    let (status, body) = ctx
        .send(request("GET", "/api/products/saved", Some(&bearer), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let saved = body["products"].as_array().unwrap();
    assert_eq!(saved.len(), 2);

    let (status, _) = ctx
        .send(request(
            "DELETE",
            &format!("/api/products/{}", id(&saved[0])),
            Some(&bearer),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .send(request(
            "DELETE",
            &format!("/api/products/{}", id(&saved[0])),
            Some(&bearer),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_single_product() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let bearer = ctx.bearer(user);
    let store = ctx.store(user, "ozon", OZON_GOOD_TOKEN).await;

    let (status, saved) = ctx
        .send(request(
            "POST",
            "/api/products/saved",
            Some(&bearer),
            Some(json!({
                "store_id": store.id,
                "external_id": "9001",
                "name": "Red mug",
                "price": 1299,
                "quantity": -3,
                "store_type": "ozon"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["quantity"], 0);

    let (status, _) = ctx
        .send(request(
            "POST",
            "/api/products/saved",
            Some(&bearer),
            Some(json!({"store_id": store.id, "external_id": "", "store_type": "ozon"})),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_upstream_failure_is_bad_gateway() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let store = ctx.store(user, "wb", WB_FAILING_TOKEN).await;

    let (status, body) = ctx
        .send(request(
            "POST",
            &format!("/api/stores/{}/sync", store.id),
            Some(&ctx.bearer(user)),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

// ============================================================================
// Mappings
// ============================================================================

#[tokio::test]
async fn test_mapping_lifecycle() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let other = ctx.user("other@example.com").await;
    let bearer = ctx.bearer(user);

    let wb = ctx.store(user, "wb", WB_GOOD_TOKEN).await;
    let ozon = ctx.store(user, "ozon", OZON_GOOD_TOKEN).await;
    let wb_products = ctx.state.products().sync_store(wb.id, user).await.unwrap();
    let ozon_products = ctx.state.products().sync_store(ozon.id, user).await.unwrap();
    let (a, b) = (wb_products[0].id, ozon_products[0].id);

    let (status, mapping) = ctx
        .send(request(
            "POST",
            "/api/mappings",
            Some(&bearer),
            Some(json!({"product1_id": a, "product2_id": b})),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(id(&mapping) > 0);

    let (status, _) = ctx
        .send(request(
            "POST",
            "/api/mappings",
            Some(&bearer),
            Some(json!({"product1_id": b, "product2_id": a})),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx
        .send(request(
            "POST",
            "/api/mappings",
            Some(&bearer),
            Some(json!({"product1_id": a, "product2_id": a})),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .send(request(
            "POST",
            "/api/mappings",
            Some(&bearer),
            Some(json!({"product1_id": a, "product2_id": 999_999})),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("999999"));

    let (status, body) = ctx
        .send(request("GET", "/api/mappings", Some(&bearer), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let mappings = body["mappings"].as_array().unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0]["product1"]["name"], "Blue mug");
    assert_eq!(mappings[0]["product2"]["name"], "Red mug");

    let uri = format!("/api/mappings/{}", id(&mapping));
    let (status, _) = ctx
        .send(request("DELETE", &uri, Some(&ctx.bearer(other)), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.send(request("DELETE", &uri, Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_mapping_foreign_product_is_forbidden() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("alice@example.com").await;
    let bob = ctx.user("bob@example.com").await;

    let alice_store = ctx.store(alice, "wb", WB_GOOD_TOKEN).await;
    let bob_store = ctx.store(bob, "ozon", OZON_GOOD_TOKEN).await;
    let mine = ctx.state.products().sync_store(alice_store.id, alice).await.unwrap();
    let theirs = ctx.state.products().sync_store(bob_store.id, bob).await.unwrap();

    let (status, _) = ctx
        .send(request(
            "POST",
            "/api/mappings",
            Some(&ctx.bearer(alice)),
            Some(json!({"product1_id": mine[0].id, "product2_id": theirs[0].id})),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
