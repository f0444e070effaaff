//! Cart store tests against the mock REST API.
//!
//! Guest carts never touch the network; once logged in every mutation goes
//! to the server cart and the store adopts what the server returns.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use zodiaco_core::{Price, ProductId, VariantId};
use zodiaco_integration_tests::{EMAIL, MockApi, PASSWORD};
use zodiaco_storefront::storage::keys;
use zodiaco_storefront::{LocalStorage, LoginForm, MemoryStorage, Storefront};

async fn logged_in(mock: &MockApi) -> Storefront {
    let storefront = mock.storefront();
    storefront
        .auth()
        .login(&LoginForm {
            email: EMAIL.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    storefront
}

// =============================================================================
// Guest
// =============================================================================

#[tokio::test]
async fn test_guest_cart_stays_local() {
    let mock = MockApi::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let storefront = mock.storefront_with(storage.clone());
    let shirt = storefront.api().product(&ProductId::new("p1")).await.unwrap();

    let cart = storefront.cart();
    cart.add_item(shirt.clone(), VariantId::new("v1"), 1)
        .await
        .unwrap();
    cart.add_item(shirt, VariantId::new("v1"), 2).await.unwrap();

    let state = cart.state();
    assert_eq!(state.cart.items().len(), 1);
    assert_eq!(state.cart.total_items(), 3);
    assert_eq!(state.cart.total_amount(), Price::from_units(120_000));
    assert!(state.error.is_none());

    assert_eq!(mock.count("POST /api/v1/cart"), 0);
    assert!(storage.get(keys::CART).unwrap().is_some());

    // Another session on the same storage picks the cart up.
    let reopened = mock.storefront_with(storage);
    reopened.start().await.unwrap();
    assert_eq!(reopened.cart().cart().total_items(), 3);
}

#[tokio::test]
async fn test_guest_clear_removes_storage_entry() {
    let mock = MockApi::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let storefront = mock.storefront_with(storage.clone());
    let cap = storefront.api().product(&ProductId::new("p2")).await.unwrap();

    storefront
        .cart()
        .add_item(cap, VariantId::new("v3"), 1)
        .await
        .unwrap();
    storefront.cart().clear().await.unwrap();

    assert!(storefront.cart().cart().is_empty());
    assert!(!storage.contains(keys::CART));
}

// =============================================================================
// Authenticated
// =============================================================================

#[tokio::test]
async fn test_login_adopts_server_cart() {
    let mock = MockApi::start().await;
    mock.seed_server_cart("p2", "v3", 2);

    let storefront = logged_in(&mock).await;
    let cart = storefront.cart().cart();

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].product.name, "Gorra Aries");
    assert_eq!(cart.total_amount(), Price::from_units(70_000));
}

#[tokio::test]
async fn test_authenticated_mutations_go_to_server() {
    let mock = MockApi::start().await;
    let storefront = logged_in(&mock).await;
    let shirt = storefront.api().product(&ProductId::new("p1")).await.unwrap();
    let cart = storefront.cart();

    cart.add_item(shirt, VariantId::new("v1"), 2).await.unwrap();
    assert_eq!(
        mock.server_cart(),
        vec![("p1".to_string(), "v1".to_string(), 2)]
    );

    cart.update_quantity(ProductId::new("p1"), VariantId::new("v1"), 5)
        .await
        .unwrap();
    assert_eq!(cart.cart().total_items(), 5);
    assert_eq!(mock.server_cart()[0].2, 5);

    cart.update_quantity(ProductId::new("p1"), VariantId::new("v1"), 0)
        .await
        .unwrap();
    assert!(cart.cart().is_empty());
    assert!(mock.server_cart().is_empty());
    assert_eq!(mock.count("DELETE /api/v1/cart/items/line-1"), 1);
}

#[tokio::test]
async fn test_failed_server_add_keeps_state_and_records_error() {
    let mock = MockApi::start().await;
    mock.seed_server_cart("p2", "v3", 1);
    let storefront = logged_in(&mock).await;
    let before = storefront.cart().cart();

    mock.reject_cart_adds();
    let shirt = storefront.api().product(&ProductId::new("p1")).await.unwrap();
    let err = storefront
        .cart()
        .add_item(shirt, VariantId::new("v1"), 1)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Stock insuficiente");
    let state = storefront.cart().state();
    assert_eq!(state.cart, before);
    assert_eq!(state.error.as_deref(), Some("Stock insuficiente"));
    assert!(!state.loading);
}

#[tokio::test]
async fn test_unknown_variant_never_reaches_server() {
    let mock = MockApi::start().await;
    let storefront = logged_in(&mock).await;
    let shirt = storefront.api().product(&ProductId::new("p1")).await.unwrap();

    let err = storefront
        .cart()
        .add_item(shirt, VariantId::new("v9"), 1)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Variant not found");
    assert_eq!(mock.count("POST /api/v1/cart/items"), 0);
}

#[tokio::test]
async fn test_removing_missing_line_is_a_noop() {
    let mock = MockApi::start().await;
    mock.seed_server_cart("p2", "v3", 1);
    let storefront = logged_in(&mock).await;
    let before = storefront.cart().cart();

    storefront
        .cart()
        .remove_item(ProductId::new("p1"), VariantId::new("v1"))
        .await
        .unwrap();

    assert_eq!(storefront.cart().cart(), before);
    assert_eq!(mock.count("DELETE /api/v1/cart"), 0);
}

#[tokio::test]
async fn test_revoked_token_falls_back_to_guest_cart() {
    let mock = MockApi::start().await;
    let storefront = logged_in(&mock).await;

    mock.revoke_tokens();
    let err = storefront.cart().sync().await.unwrap_err();
    assert_eq!(err.to_string(), "Unauthorized - Please login again");
    assert!(!storefront.api().is_authenticated().await);

    // The next operation runs against local storage.
    let cap = storefront.api().product(&ProductId::new("p2")).await.unwrap();
    storefront
        .cart()
        .add_item(cap, VariantId::new("v3"), 1)
        .await
        .unwrap();
    assert_eq!(mock.count("POST /api/v1/cart/items"), 0);
    assert_eq!(storefront.cart().cart().total_items(), 1);
}

#[tokio::test]
async fn test_server_timeout_keeps_cart_and_records_error() {
    let mock = MockApi::start().await;
    mock.seed_server_cart("p2", "v3", 1);
    let storefront = mock.storefront_with_timeout(Duration::from_millis(200));
    storefront
        .auth()
        .login(&LoginForm {
            email: EMAIL.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    let shirt = storefront.api().product(&ProductId::new("p1")).await.unwrap();
    let before = storefront.cart().cart();

    mock.respond_after(Duration::from_secs(5));
    let err = storefront
        .cart()
        .add_item(shirt, VariantId::new("v1"), 1)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Network error: request timed out");
    let state = storefront.cart().state();
    assert_eq!(state.cart, before);
    assert_eq!(state.error.as_deref(), Some("Network error: request timed out"));
    assert!(!state.loading);
    // A timeout is not an auth failure; the session survives.
    assert!(storefront.api().is_authenticated().await);
}
