//! Customer account types: users, addresses and orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, ProductVariant};
use crate::types::{AddressId, OrderId, Price, ProductId, UserId, VariantId, timestamp};

// =============================================================================
// User
// =============================================================================

/// A registered customer.
///
/// The backend uses camelCase for the name fields and snake_case for the
/// rest; both spellings are accepted for the names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(rename = "firstName", alias = "first_name", default)]
    pub first_name: String,
    #[serde(rename = "lastName", alias = "last_name", default)]
    pub last_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// First and last name joined with a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Address
// =============================================================================

/// Whether an address is used for shipping or billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    #[default]
    Shipping,
    Billing,
}

/// Postal address fields shared by saved addresses and order addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

impl PostalAddress {
    /// Single-line rendering for lists and summaries.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.address_line_1.as_str(),
            self.address_line_2.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A saved customer address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(rename = "type", default)]
    pub kind: AddressKind,
    #[serde(flatten)]
    pub postal: PostalAddress,
    #[serde(default)]
    pub is_default: bool,
}

/// Body of `POST /users/addresses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    #[serde(rename = "type")]
    pub kind: AddressKind,
    #[serde(flatten)]
    pub postal: PostalAddress,
    pub is_default: bool,
}

/// Body of `PUT /users/addresses/{id}`. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressUpdate {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AddressKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

// =============================================================================
// Orders
// =============================================================================

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub id: Option<String>,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Unit price at the time the order was placed.
    pub price: Price,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub variant: Option<ProductVariant>,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub status: String,
    pub total_amount: Price,
    #[serde(default)]
    pub tax_amount: Price,
    #[serde(default)]
    pub shipping_amount: Price,
    #[serde(default)]
    pub discount_amount: Price,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: Option<PostalAddress>,
    #[serde(default)]
    pub billing_address: Option<PostalAddress>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One line of an order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
    pub shipping_address: PostalAddress,
    pub billing_address: PostalAddress,
    pub payment_method: String,
}
