//! Catalog browsing commands.
//!
//! # Usage
//!
//! ```bash
//! zodiaco products list --q camiseta --in-stock
//! zodiaco products show p1
//! zodiaco products featured --limit 8
//! zodiaco products related p1
//! zodiaco products reviews p1 --page 2
//! zodiaco categories
//! zodiaco categories signos-de-fuego
//! ```

use zodiaco_core::{CategoryId, NewReview, ProductId, ProductQuery};
use zodiaco_storefront::Storefront;
use zodiaco_storefront::error::Result;

use crate::views;

pub async fn list(storefront: &Storefront, query: &ProductQuery) -> Result<String> {
    let page = storefront.api().products(query).await?;
    Ok(views::product_page(&page))
}

pub async fn show(storefront: &Storefront, id: &ProductId) -> Result<String> {
    let product = storefront.api().product(id).await?;
    Ok(views::product_detail(&product))
}

pub async fn featured(storefront: &Storefront, limit: u32) -> Result<String> {
    let products = storefront.api().featured_products(limit).await?;
    Ok(views::product_rows(&products))
}

pub async fn related(storefront: &Storefront, id: &ProductId, limit: u32) -> Result<String> {
    let products = storefront.api().related_products(id, limit).await?;
    Ok(views::product_rows(&products))
}

pub async fn reviews(
    storefront: &Storefront,
    id: &ProductId,
    page: u32,
    limit: u32,
) -> Result<String> {
    let reviews = storefront.api().product_reviews(id, page, limit).await?;
    Ok(views::reviews(&reviews))
}

/// Post a review. Requires a logged-in customer.
pub async fn review(storefront: &Storefront, id: &ProductId, review: &NewReview) -> Result<String> {
    let posted = storefront.api().add_product_review(id, review).await?;
    Ok(format!("Gracias por tu reseña {}", views::stars(posted.rating)))
}

/// Without an ID, list every category; with one, list a page of its products.
pub async fn categories(
    storefront: &Storefront,
    id: Option<&CategoryId>,
    page: u32,
    limit: u32,
) -> Result<String> {
    match id {
        Some(id) => {
            let products = storefront.api().category_products(id, page, limit).await?;
            Ok(views::product_page(&products))
        }
        None => {
            let categories = storefront.api().categories().await?;
            Ok(views::categories(&categories))
        }
    }
}
