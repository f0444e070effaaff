//! Catalog types: products, variants, images, categories and reviews.
//!
//! These are read-only copies of data owned by the storefront API. Optional
//! or missing fields fall back to their defaults so older backend versions
//! still deserialize.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ImageId, Price, ProductId, ReviewId, UserId, VariantId, timestamp};

// =============================================================================
// Product
// =============================================================================

/// Physical dimensions of a product, in centimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Find a variant of this product by ID.
    #[must_use]
    pub fn variant(&self, variant_id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == variant_id)
    }

    /// Variants that can currently be purchased.
    pub fn active_variants(&self) -> impl Iterator<Item = &ProductVariant> {
        self.variants.iter().filter(|v| v.is_active)
    }

    /// The image flagged as primary, or the first by sort order.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.iter().min_by_key(|img| img.sort_order))
    }

    /// Lowest price among active variants.
    #[must_use]
    pub fn min_price(&self) -> Option<Price> {
        self.active_variants().map(|v| v.price).min()
    }

    /// Mean review rating, if the product has reviews.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Review counts stay far below f64 precision
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        Some(f64::from(sum) / self.reviews.len() as f64)
    }
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Variant
// =============================================================================

/// A purchasable SKU under a product (e.g. a specific size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub compare_at_price: Option<Price>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub low_stock_threshold: i64,
    /// Free-form attributes such as `{"size": "M"}`.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl ProductVariant {
    /// Whether any units are in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether stock has fallen to the low-stock threshold.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.in_stock() && self.stock <= self.low_stock_threshold
    }

    /// Read a string attribute such as `size`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(serde_json::Value::as_str)
    }

    /// Discount relative to the compare-at price, in whole percent.
    ///
    /// Returns `None` when there is no compare-at price or it is not higher
    /// than the selling price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let compare = self.compare_at_price?.amount();
        let price = self.price.amount();
        if compare <= price || compare.is_zero() {
            return None;
        }
        compare
            .checked_sub(price)?
            .checked_mul(Decimal::ONE_HUNDRED)?
            .checked_div(compare)?
            .round()
            .to_u32()
    }
}

// =============================================================================
// Images, categories, reviews
// =============================================================================

/// A product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
}

/// A customer review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Star rating, 1 to 5.
    pub rating: u8,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub is_verified_purchase: bool,
    #[serde(default)]
    pub helpful_count: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /products/{id}/reviews`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// =============================================================================
// Catalog queries
// =============================================================================

/// Filters for `GET /products`. Unset fields are omitted from the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub in_stock: Option<bool>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Query pairs in a stable order, skipping unset filters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(brand) = &self.brand {
            pairs.push(("brand", brand.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.amount().to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.amount().to_string()));
        }
        if let Some(in_stock) = self.in_stock {
            pairs.push(("in_stock", in_stock.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;

    /// Minimal product with one variant per `(id, price)` pair.
    pub(crate) fn product(id: &str, variants: &[(&str, i64)]) -> Product {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Producto {id}"),
            "variants": variants
                .iter()
                .map(|(vid, price)| json!({
                    "id": vid,
                    "product_id": id,
                    "price": price,
                    "stock": 10,
                    "attributes": {"size": "M"},
                }))
                .collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    #[test]
    fn test_product_deserializes_with_defaults() {
        let p = product("p1", &[("v1", 45_000)]);
        assert!(p.is_active);
        assert!(!p.is_featured);
        assert!(p.images.is_empty());
        assert_eq!(p.created_at, None);
        assert_eq!(p.variants.len(), 1);
    }

    #[test]
    fn test_variant_lookup_and_attributes() {
        let p = product("p1", &[("v1", 45_000), ("v2", 50_000)]);
        let v2 = p.variant(&VariantId::new("v2")).unwrap();
        assert_eq!(v2.price, Price::from_units(50_000));
        assert_eq!(v2.attribute("size"), Some("M"));
        assert!(p.variant(&VariantId::new("nope")).is_none());
        assert_eq!(p.min_price(), Some(Price::from_units(45_000)));
    }

    #[test]
    fn test_discount_percent() {
        let mut v = product("p1", &[("v1", 75_000)]).variants.remove(0);
        assert_eq!(v.discount_percent(), None);

        v.compare_at_price = Some(Price::from_units(100_000));
        assert_eq!(v.discount_percent(), Some(25));

        v.compare_at_price = Some(Price::from_units(50_000));
        assert_eq!(v.discount_percent(), None);

        v.compare_at_price = Some(Price::new(Decimal::MAX));
        assert_eq!(v.discount_percent(), None);
    }

    #[test]
    fn test_low_stock() {
        let mut v = product("p1", &[("v1", 1_000)]).variants.remove(0);
        v.low_stock_threshold = 5;
        v.stock = 3;
        assert!(v.is_low_stock());
        v.stock = 0;
        assert!(!v.in_stock());
        assert!(!v.is_low_stock());
    }

    #[test]
    fn test_primary_image_falls_back_to_sort_order() {
        let p: Product = serde_json::from_value(json!({
            "id": "p1",
            "name": "Camisa",
            "images": [
                {"id": "i2", "url": "b.jpg", "sort_order": 2},
                {"id": "i1", "url": "a.jpg", "sort_order": 1},
            ],
        }))
        .unwrap();
        assert_eq!(p.primary_image().unwrap().url, "a.jpg");
    }

    #[test]
    fn test_product_query_pairs_skip_unset() {
        let query = ProductQuery {
            q: Some("camisa".to_string()),
            in_stock: Some(true),
            page: Some(2),
            ..ProductQuery::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("q", "camisa".to_string()),
                ("in_stock", "true".to_string()),
                ("page", "2".to_string()),
            ]
        );
        assert!(ProductQuery::default().to_pairs().is_empty());
    }
}
