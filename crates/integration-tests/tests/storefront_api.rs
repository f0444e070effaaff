//! API client tests against the mock REST API.
//!
//! These cover the wire contract: envelope shapes, error messages, query
//! strings and bearer-token handling.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use zodiaco_core::{Price, ProductId, ProductQuery};
use zodiaco_integration_tests::{EMAIL, MockApi, PASSWORD};
use zodiaco_storefront::api::LoginRequest;
use zodiaco_storefront::storage::keys;
use zodiaco_storefront::{ApiError, LocalStorage, MemoryStorage, StorefrontConfig};

fn credentials() -> LoginRequest {
    LoginRequest {
        email: EMAIL.to_string(),
        password: PASSWORD.to_string(),
    }
}

// =============================================================================
// Envelopes
// =============================================================================

#[tokio::test]
async fn test_catalog_envelopes_are_unwrapped() {
    let mock = MockApi::start().await;
    let api = mock.storefront().api().clone();

    // {"products": [...], "pagination": {...}}
    let page = api.products(&ProductQuery::default()).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.pagination.total, 2);

    // {"product": {...}}
    let product = api.product(&ProductId::new("p1")).await.unwrap();
    assert_eq!(product.name, "Camiseta Leo");
    assert_eq!(product.min_price(), Some(Price::from_units(40_000)));

    // bare array
    let featured = api.featured_products(4).await.unwrap();
    assert_eq!(featured.len(), 1);

    // {"items": [...]}
    let related = api.related_products(&ProductId::new("p1"), 4).await.unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, ProductId::new("p2"));

    // {"categories": [...]}
    let categories = api.categories().await.unwrap();
    assert_eq!(categories[0].name, "Signos de Fuego");
}

#[tokio::test]
async fn test_query_string_is_built_from_set_filters() {
    let mock = MockApi::start().await;
    let api = mock.storefront().api().clone();

    let query = ProductQuery {
        q: Some("camiseta leo".to_string()),
        in_stock: Some(true),
        page: Some(2),
        ..ProductQuery::default()
    };
    api.products(&query).await.unwrap();

    assert_eq!(
        mock.requests(),
        vec!["GET /api/v1/products?q=camiseta+leo&in_stock=true&page=2".to_string()]
    );
}

#[tokio::test]
async fn test_catalog_reads_are_cached() {
    let mock = MockApi::start().await;
    let api = mock.storefront().api().clone();

    api.product(&ProductId::new("p1")).await.unwrap();
    api.product(&ProductId::new("p1")).await.unwrap();
    api.categories().await.unwrap();
    api.categories().await.unwrap();
    assert_eq!(mock.count("GET /api/v1/products/p1"), 1);
    assert_eq!(mock.count("GET /api/v1/products/categories"), 1);

    api.invalidate_catalog();
    api.product(&ProductId::new("p1")).await.unwrap();
    assert_eq!(mock.count("GET /api/v1/products/p1"), 2);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_server_message_is_surfaced() {
    let mock = MockApi::start().await;
    let api = mock.storefront().api().clone();

    let err = api.product(&ProductId::new("nope")).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Producto no encontrado");

    // {"error": {"message": ...}}
    let err = api
        .login(&LoginRequest {
            email: EMAIL.to_string(),
            password: "incorrecta".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "Credenciales inválidas");
}

#[tokio::test]
async fn test_closed_port_is_a_network_error() {
    let config = StorefrontConfig::for_api("http://127.0.0.1:9/api/v1").unwrap();
    let api = zodiaco_storefront::ApiClient::new(&config, Arc::new(MemoryStorage::new())).unwrap();

    let err = api.categories().await.unwrap_err();
    assert!(err.is_network(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_slow_response_times_out_as_network_error() {
    let mock = MockApi::start().await;
    let api = mock
        .storefront_with_timeout(Duration::from_millis(200))
        .api()
        .clone();
    mock.respond_after(Duration::from_secs(5));

    let err = api.categories().await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)), "unexpected error: {err:?}");
    assert!(err.is_network());
    assert_eq!(err.status(), None);
    assert_eq!(mock.count("GET /api/v1/products/categories"), 1);
}

// =============================================================================
// Tokens
// =============================================================================

#[tokio::test]
async fn test_login_stores_tokens() {
    let mock = MockApi::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let storefront = mock.storefront_with(storage.clone());

    let auth = storefront.api().login(&credentials()).await.unwrap();
    assert_eq!(auth.user.email, EMAIL);
    assert!(storefront.api().is_authenticated().await);
    assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("tok-ana"));
    assert_eq!(storage.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("ref-ana"));

    // A new session over the same storage starts authenticated.
    let restored = mock.storefront_with(storage);
    let user = restored.api().current_user().await.unwrap();
    assert_eq!(user.first_name, "Ana");
}

#[tokio::test]
async fn test_unauthorized_clears_token() {
    let mock = MockApi::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let storefront = mock.storefront_with(storage.clone());
    storefront.api().login(&credentials()).await.unwrap();

    mock.revoke_tokens();
    let err = storefront.api().current_user().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(err.to_string(), "Unauthorized - Please login again");
    assert!(!storefront.api().is_authenticated().await);
    assert!(!storage.contains(keys::ACCESS_TOKEN));
    assert!(!storage.contains(keys::REFRESH_TOKEN));
}

#[tokio::test]
async fn test_refresh_token_exchange() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();
    storefront.api().login(&credentials()).await.unwrap();

    let refreshed = storefront.api().refresh_token().await.unwrap();
    assert_eq!(refreshed.access_token, "tok-ana");
    assert!(storefront.api().is_authenticated().await);
}

#[tokio::test]
async fn test_logout_clears_tokens() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();
    storefront.api().login(&credentials()).await.unwrap();

    storefront.api().logout().await.unwrap();
    assert!(!storefront.api().is_authenticated().await);
    assert_eq!(mock.count("POST /api/v1/auth/logout"), 1);
}
