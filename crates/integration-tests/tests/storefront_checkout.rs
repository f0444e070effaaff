//! Session, checkout and account flows against the mock REST API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use zodiaco_core::{AddressKind, NewAddress, OrderId, PostalAddress, ProductId, VariantId};
use zodiaco_integration_tests::{EMAIL, MockApi, PASSWORD};
use zodiaco_storefront::{
    CheckoutError, CheckoutForm, FormError, LoginForm, PaymentMethod, RegisterForm, Storefront,
    StorefrontError,
};

fn login_form() -> LoginForm {
    LoginForm {
        email: EMAIL.to_string(),
        password: PASSWORD.to_string(),
    }
}

fn checkout_form() -> CheckoutForm {
    CheckoutForm {
        email: EMAIL.to_string(),
        first_name: "Ana".to_string(),
        last_name: "Ruiz".to_string(),
        address: "Calle 10 # 5-20".to_string(),
        city: "Medellín".to_string(),
        postal_code: "050021".to_string(),
        phone: "3001234567".to_string(),
        payment_method: PaymentMethod::Pse,
    }
}

async fn fill_cart(storefront: &Storefront) {
    let shirt = storefront.api().product(&ProductId::new("p1")).await.unwrap();
    storefront
        .cart()
        .add_item(shirt, VariantId::new("v1"), 2)
        .await
        .unwrap();
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn test_login_and_logout() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();

    let user = storefront.auth().login(&login_form()).await.unwrap();
    assert_eq!(user.full_name(), "Ana Ruiz");
    assert_eq!(storefront.auth().user(), Some(user));

    storefront.auth().logout().await;
    assert!(storefront.auth().user().is_none());
    assert!(!storefront.api().is_authenticated().await);
}

#[tokio::test]
async fn test_start_restores_session() {
    let mock = MockApi::start().await;
    let storage = std::sync::Arc::new(zodiaco_storefront::MemoryStorage::new());
    mock.storefront_with(storage.clone())
        .auth()
        .login(&login_form())
        .await
        .unwrap();
    mock.seed_server_cart("p2", "v3", 1);

    let storefront = mock.storefront_with(storage);
    storefront.start().await.unwrap();

    assert_eq!(storefront.auth().user().unwrap().email, EMAIL);
    assert_eq!(storefront.cart().cart().total_items(), 1);
}

#[tokio::test]
async fn test_register_conflict_message() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();

    let err = storefront
        .auth()
        .register(&RegisterForm {
            email: EMAIL.to_string(),
            password: PASSWORD.to_string(),
            confirm_password: PASSWORD.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            accept_terms: true,
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Email already registered");
    assert!(storefront.auth().user().is_none());
}

#[tokio::test]
async fn test_register_new_account() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();

    let user = storefront
        .auth()
        .register(&RegisterForm {
            email: "leo@zodiaco.co".to_string(),
            password: PASSWORD.to_string(),
            confirm_password: PASSWORD.to_string(),
            first_name: "Leo".to_string(),
            last_name: "Gómez".to_string(),
            accept_terms: true,
        })
        .await
        .unwrap();

    assert_eq!(user.first_name, "Leo");
    assert!(storefront.api().is_authenticated().await);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_guest_checkout_clears_cart() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();
    fill_cart(&storefront).await;

    let summary = storefront.checkout().summary();
    let order = storefront.checkout().submit(&checkout_form()).await.unwrap();

    assert_eq!(order.order_number, "ZD-1001");
    assert_eq!(order.total_amount, summary.total);
    assert!(storefront.cart().cart().is_empty());

    let sent = &mock.orders()[0];
    assert_eq!(sent["payment_method"], "pse");
    assert_eq!(sent["items"][0]["quantity"], 2);
    assert_eq!(sent["shipping_address"]["country"], "CO");
    assert_eq!(sent["shipping_address"], sent["billing_address"]);
}

#[tokio::test]
async fn test_rejected_order_keeps_cart() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();
    fill_cart(&storefront).await;
    mock.reject_orders();

    let err = storefront
        .checkout()
        .submit(&checkout_form())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Api(_)));
    assert_eq!(err.to_string(), "Pago rechazado");
    assert_eq!(storefront.cart().cart().total_items(), 2);
}

#[tokio::test]
async fn test_invalid_checkout_makes_no_request() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();
    fill_cart(&storefront).await;

    let mut form = checkout_form();
    form.email = "ana@".to_string();
    let err = storefront.checkout().submit(&form).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Form(FormError::InvalidEmail(_))));
    assert_eq!(mock.count("POST /api/v1/orders"), 0);

    let err = mock
        .storefront()
        .checkout()
        .submit(&checkout_form())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn test_authenticated_checkout_and_history() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();
    storefront.auth().login(&login_form()).await.unwrap();
    fill_cart(&storefront).await;

    let order = storefront.checkout().submit(&checkout_form()).await.unwrap();
    assert!(mock.server_cart().is_empty());
    assert_eq!(mock.count("DELETE /api/v1/cart"), 1);

    let history = storefront.api().orders(1, 20).await.unwrap();
    assert_eq!(history.items.len(), 1);
    assert_eq!(history.items[0].id, order.id);

    let fetched = storefront.api().order(&OrderId::new("o1")).await.unwrap();
    assert_eq!(fetched.items[0].variant_id, VariantId::new("v1"));
}

// =============================================================================
// Account
// =============================================================================

#[tokio::test]
async fn test_address_book() {
    let mock = MockApi::start().await;
    let storefront = mock.storefront();
    storefront.auth().login(&login_form()).await.unwrap();

    let saved = storefront
        .api()
        .add_address(&NewAddress {
            kind: AddressKind::Shipping,
            postal: PostalAddress {
                first_name: "Ana".to_string(),
                last_name: "Ruiz".to_string(),
                address_line_1: "Calle 10 # 5-20".to_string(),
                city: "Medellín".to_string(),
                postal_code: "050021".to_string(),
                country: "CO".to_string(),
                ..PostalAddress::default()
            },
            is_default: true,
        })
        .await
        .unwrap();
    assert!(saved.is_default);
    assert_eq!(storefront.api().addresses().await.unwrap().len(), 1);

    storefront.api().delete_address(&saved.id).await.unwrap();
    assert!(storefront.api().addresses().await.unwrap().is_empty());

    let err = storefront.api().delete_address(&saved.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_network_failure_message() {
    let config = zodiaco_storefront::StorefrontConfig::for_api("http://127.0.0.1:9/api/v1").unwrap();
    let storefront = Storefront::with_storage(
        config,
        std::sync::Arc::new(zodiaco_storefront::MemoryStorage::new()),
    )
    .unwrap();

    let err = StorefrontError::from(
        storefront
            .api()
            .product(&ProductId::new("p1"))
            .await
            .unwrap_err(),
    );
    assert_eq!(
        err.user_message(),
        zodiaco_storefront::error::NETWORK_MESSAGE
    );
}
