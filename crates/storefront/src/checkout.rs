//! Order placement.

use thiserror::Error;
use tracing::{info, instrument, warn};
use zodiaco_core::{Cart, NewOrder, Order, Price};

use crate::api::{ApiClient, ApiError};
use crate::cart::CartStore;
use crate::forms::{CheckoutForm, FormError};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Form(#[from] FormError),

    #[error("Tu carrito está vacío")]
    EmptyCart,

    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Totals shown next to the checkout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Price,
    /// Shipping is free on every storefront order.
    pub shipping: Price,
    pub total: Price,
    pub items: u32,
}

impl OrderSummary {
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        let subtotal = cart.total_amount();
        Self {
            subtotal,
            shipping: Price::ZERO,
            total: subtotal,
            items: cart.total_items(),
        }
    }
}

/// Build the `POST /orders` body for a cart and a checkout form.
///
/// The form's address is used as both shipping and billing address.
///
/// # Errors
///
/// Returns `CheckoutError::Form` if the form is invalid, or
/// `CheckoutError::EmptyCart` if the cart has no lines.
pub fn build_order(form: &CheckoutForm, cart: &Cart) -> Result<NewOrder, CheckoutError> {
    let valid = form.validate()?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    Ok(NewOrder {
        items: cart.order_items(),
        shipping_address: valid.address.clone(),
        billing_address: valid.address,
        payment_method: valid.payment_method.as_str().to_string(),
    })
}

/// Places orders for the session cart.
#[derive(Debug, Clone)]
pub struct Checkout {
    api: ApiClient,
    cart: CartStore,
}

impl Checkout {
    #[must_use]
    pub const fn new(api: ApiClient, cart: CartStore) -> Self {
        Self { api, cart }
    }

    /// Totals for the current cart.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::for_cart(&self.cart.cart())
    }

    /// Validate the form, submit the order and clear the cart.
    ///
    /// The cart is only cleared once the server has accepted the order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Form` or `CheckoutError::EmptyCart` before any
    /// request is made, or `CheckoutError::Api` if the server rejects the
    /// order.
    #[instrument(skip(self, form), fields(payment = %form.payment_method))]
    pub async fn submit(&self, form: &CheckoutForm) -> Result<Order, CheckoutError> {
        let order = build_order(form, &self.cart.cart())?;
        let placed = self.api.create_order(&order).await?;

        info!(order_id = %placed.id, order_number = %placed.order_number, "Order placed");

        if let Err(e) = self.cart.clear().await {
            warn!(error = %e, "Order placed but the cart could not be cleared");
        }
        Ok(placed)
    }
}
