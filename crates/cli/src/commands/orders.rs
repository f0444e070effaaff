//! Checkout and order history.
//!
//! # Usage
//!
//! ```bash
//! zodiaco checkout --address "Calle 10 # 5-20" --city Medellín \
//!     --postal-code 050021 --phone 3001234567 --payment pse
//! zodiaco orders list
//! zodiaco orders show ZD-1001
//! ```

use zodiaco_core::OrderId;
use zodiaco_storefront::error::Result;
use zodiaco_storefront::{CheckoutForm, Storefront};

use crate::views;

/// Place an order for the current cart.
///
/// Contact fields left empty are taken from the logged-in customer.
pub async fn checkout(storefront: &Storefront, mut form: CheckoutForm) -> Result<String> {
    if let Some(user) = storefront.auth().refresh_user().await {
        fill_from_user(&mut form, &user.email, &user.first_name, &user.last_name);
    }
    storefront.cart().sync().await?;

    let summary = views::order_summary(&storefront.checkout().summary());
    let order = storefront.checkout().submit(&form).await?;
    Ok(format!("{summary}\n\n{}", views::order_placed(&order)))
}

fn fill_from_user(form: &mut CheckoutForm, email: &str, first_name: &str, last_name: &str) {
    for (field, value) in [
        (&mut form.email, email),
        (&mut form.first_name, first_name),
        (&mut form.last_name, last_name),
    ] {
        if field.trim().is_empty() {
            *field = value.to_string();
        }
    }
}

pub async fn list(storefront: &Storefront, page: u32, limit: u32) -> Result<String> {
    let orders = storefront.api().orders(page, limit).await?;
    Ok(views::orders(&orders))
}

pub async fn show(storefront: &Storefront, id: &OrderId) -> Result<String> {
    let order = storefront.api().order(id).await?;
    Ok(views::order_detail(&order))
}
