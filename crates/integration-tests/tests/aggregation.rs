//! Integration tests for live product aggregation and store sync.
//!
//! Marketplaces are served by the local mock, so these run without network
//! access.

#![allow(clippy::unwrap_used)]

use marketlink_core::{StoreType, UNKNOWN_PRODUCT_NAME, UserId};
use marketlink_integration_tests::{
    OZON_GOOD_TOKEN, TestContext, WB_EMPTY_TOKEN, WB_FAILING_TOKEN, WB_GOOD_TOKEN,
    WB_LAGGING_TOKEN, WB_SLOW_TOKEN,
};
use marketlink_server::db::StoreRepository;
use marketlink_server::error::AppError;
use secrecy::ExposeSecret;

// ============================================================================
// Aggregation
// ============================================================================

#[tokio::test]
async fn test_provider_with_no_products_yields_empty_result() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    ctx.store(user, "wb", WB_EMPTY_TOKEN).await;

    let products = ctx.state.products().get_live_products_for_user(user).await.unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn test_user_without_stores_yields_empty_result() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;

    let products = ctx.state.products().get_live_products_for_user(user).await.unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn test_normalizes_both_providers() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let wb = ctx.store(user, "wb", WB_GOOD_TOKEN).await;
    let ozon = ctx.store(user, "ozon", OZON_GOOD_TOKEN).await;

    let products = ctx.state.products().get_live_products_for_user(user).await.unwrap();

    let summary: Vec<(_, &str, &str, i64, i64)> = products
        .iter()
        .map(|p| {
            (
                p.store_id,
                p.product.external_id.as_str(),
                p.product.name.as_str(),
                p.product.price,
                p.product.quantity,
            )
        })
        .collect();

    // Cards without an id are dropped; negatives clamp to zero; Ozon prices truncate.
    assert_eq!(
        summary,
        vec![
            (wb.id, "111", "Blue mug", 1500, 4),
            (wb.id, "222", UNKNOWN_PRODUCT_NAME, 0, 0),
            (ozon.id, "9001", "Red mug", 1299, 7),
        ]
    );
    assert_eq!(products[0].product.store_type, StoreType::Wildberries);
    assert_eq!(products[2].product.store_type, StoreType::Ozon);
}

#[tokio::test]
async fn test_slower_earlier_store_keeps_its_place() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let lagging = ctx.store(user, "wb", WB_LAGGING_TOKEN).await;
    let ozon = ctx.store(user, "ozon", OZON_GOOD_TOKEN).await;
    let wb = ctx.store(user, "wb", WB_GOOD_TOKEN).await;

    let products = ctx.state.products().get_live_products_for_user(user).await.unwrap();

    let order: Vec<_> = products
        .iter()
        .map(|p| (p.store_id, p.product.external_id.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            (lagging.id, "333"),
            (ozon.id, "9001"),
            (wb.id, "111"),
            (wb.id, "222"),
        ]
    );
}

#[tokio::test]
async fn test_undecryptable_token_is_skipped() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    ctx.db.insert_raw_store(user, "wb", "%%% not ciphertext %%%");
    let good = ctx.store(user, "wb", WB_GOOD_TOKEN).await;

    let products = ctx.state.products().get_live_products_for_user(user).await.unwrap();

    assert_eq!(products.len(), 2);
    assert!(products.iter().all(|p| p.store_id == good.id));
}

#[tokio::test]
async fn test_failing_slow_and_unknown_stores_are_skipped() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    ctx.store(user, "wb", WB_FAILING_TOKEN).await;
    ctx.store(user, "wb", WB_SLOW_TOKEN).await;
    ctx.db.insert_raw_store(user, "yandex", "irrelevant");
    let ozon = ctx.store(user, "ozon", OZON_GOOD_TOKEN).await;

    let products = ctx.state.products().get_live_products_for_user(user).await.unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].store_id, ozon.id);
    assert_eq!(products[0].product.external_id, "9001");
}

#[tokio::test]
async fn test_ozon_without_client_id_is_skipped() {
    let ctx = TestContext::with_marketplace(|config| config.ozon_client_id = None).await;
    let user = ctx.user("seller@example.com").await;
    ctx.store(user, "ozon", OZON_GOOD_TOKEN).await;
    let wb = ctx.store(user, "wb", WB_GOOD_TOKEN).await;

    let products = ctx.state.products().get_live_products_for_user(user).await.unwrap();

    assert_eq!(products.len(), 2);
    assert!(products.iter().all(|p| p.store_id == wb.id));
}

#[tokio::test]
async fn test_only_own_stores_are_aggregated() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("alice@example.com").await;
    let bob = ctx.user("bob@example.com").await;
    ctx.store(alice, "wb", WB_GOOD_TOKEN).await;
    ctx.store(bob, "ozon", OZON_GOOD_TOKEN).await;

    let products = ctx.state.products().get_live_products_for_user(bob).await.unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].product.store_type, StoreType::Ozon);
}

// ============================================================================
// Sync and saved products
// ============================================================================

#[tokio::test]
async fn test_sync_saves_and_refreshes_products() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let wb = ctx.store(user, "wb", WB_GOOD_TOKEN).await;

    let first = ctx.state.products().sync_store(wb.id, user).await.unwrap();
    assert_eq!(first.len(), 2);

    // A second sync upserts on (store_id, external_id) instead of duplicating.
    let second = ctx.state.products().sync_store(wb.id, user).await.unwrap();
    let first_ids: Vec<_> = first.iter().map(|p| p.id).collect();
    let second_ids: Vec<_> = second.iter().map(|p| p.id).collect();
    assert_eq!(first_ids, second_ids);

    let saved = ctx.state.products().get_saved_products(user).await.unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|p| p.store_id == wb.id));
}

#[tokio::test]
async fn test_sync_reports_upstream_failure() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let failing = ctx.store(user, "wb", WB_FAILING_TOKEN).await;

    let err = ctx.state.products().sync_store(failing.id, user).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
    assert!(ctx.state.products().get_saved_products(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_of_foreign_store_is_not_found() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("alice@example.com").await;
    let bob = ctx.user("bob@example.com").await;
    let store = ctx.store(alice, "wb", WB_GOOD_TOKEN).await;

    let err = ctx.state.products().sync_store(store.id, bob).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_save_live_product_into_wrong_store_type() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    ctx.store(user, "wb", WB_GOOD_TOKEN).await;
    let ozon = ctx.store(user, "ozon", OZON_GOOD_TOKEN).await;

    let live = ctx.state.products().get_live_products_for_user(user).await.unwrap();
    let wb_product = &live[0].product;

    let err = ctx
        .state
        .products()
        .save_product(user, ozon.id, wb_product)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let saved = ctx
        .state
        .products()
        .save_product(user, live[0].store_id, wb_product)
        .await
        .unwrap();
    assert_eq!(saved.external_id, "111");
}

#[tokio::test]
async fn test_deleting_store_removes_saved_products() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let wb = ctx.store(user, "wb", WB_GOOD_TOKEN).await;
    ctx.state.products().sync_store(wb.id, user).await.unwrap();

    ctx.state.stores().delete_store(wb.id, user).await.unwrap();

    assert!(ctx.state.products().get_saved_products(user).await.unwrap().is_empty());
    let err = ctx
        .state
        .stores()
        .delete_store(wb.id, user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_stored_token_is_encrypted_and_owner_scoped() {
    let ctx = TestContext::new().await;
    let user = ctx.user("seller@example.com").await;
    let store = ctx.store(user, "wb", WB_GOOD_TOKEN).await;

    let stored = StoreRepository::get_encrypted_token(&ctx.db, store.id, user)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored, WB_GOOD_TOKEN);
    assert!(!stored.contains(WB_GOOD_TOKEN));

    let decrypted = ctx
        .state
        .stores()
        .get_decrypted_token(store.id, user)
        .await
        .unwrap();
    assert_eq!(decrypted.expose_secret(), WB_GOOD_TOKEN);

    let err = ctx
        .state
        .stores()
        .get_decrypted_token(store.id, UserId::new(user.as_i32() + 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
