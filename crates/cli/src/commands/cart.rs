//! Cart commands.
//!
//! Guests keep their cart in the local data directory; after `zodiaco login`
//! the same commands operate on the server cart.
//!
//! # Usage
//!
//! ```bash
//! zodiaco cart add p1 v1 --quantity 2
//! zodiaco cart update p1 v1 3
//! zodiaco cart remove p1 v1
//! zodiaco cart show
//! zodiaco cart clear
//! ```

use zodiaco_core::{ProductId, VariantId};
use zodiaco_storefront::error::{Result, add_breadcrumb};
use zodiaco_storefront::{CartStore, Storefront};

use crate::views;

/// Load the cart for the current credentials.
///
/// A failed sync is recorded in the cart state and shown by the view.
async fn load(storefront: &Storefront) -> &CartStore {
    let cart = storefront.cart();
    if let Err(e) = cart.sync().await {
        tracing::warn!(error = %e, "Cart sync failed");
    }
    cart
}

pub async fn show(storefront: &Storefront) -> Result<String> {
    let cart = load(storefront).await;
    Ok(views::cart(&cart.state()))
}

pub async fn add(
    storefront: &Storefront,
    product_id: &ProductId,
    variant_id: VariantId,
    quantity: u32,
) -> Result<String> {
    let product = storefront.api().product(product_id).await?;
    let cart = load(storefront).await;

    add_breadcrumb(
        "cart",
        "Add item",
        Some(&[("product_id", product_id.as_str()), ("variant_id", variant_id.as_str())]),
    );
    cart.add_item(product, variant_id, quantity).await?;
    Ok(views::cart(&cart.state()))
}

pub async fn remove(
    storefront: &Storefront,
    product_id: ProductId,
    variant_id: VariantId,
) -> Result<String> {
    let cart = load(storefront).await;
    cart.remove_item(product_id, variant_id).await?;
    Ok(views::cart(&cart.state()))
}

pub async fn update(
    storefront: &Storefront,
    product_id: ProductId,
    variant_id: VariantId,
    quantity: i64,
) -> Result<String> {
    let cart = load(storefront).await;
    cart.update_quantity(product_id, variant_id, quantity).await?;
    Ok(views::cart(&cart.state()))
}

pub async fn clear(storefront: &Storefront) -> Result<String> {
    let cart = load(storefront).await;
    cart.clear().await?;
    Ok(views::cart(&cart.state()))
}
