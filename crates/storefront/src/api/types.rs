//! Request and response bodies specific to the REST API.
//!
//! Resource types shared with the rest of the workspace live in
//! `zodiaco_core`; this module only holds wire shapes the client needs.

use serde::{Deserialize, Serialize};
use zodiaco_core::{CartItem, CartItemId, Price, Product, ProductVariant, User};

// =============================================================================
// Auth
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Response of login and registration.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}

/// Response of `POST /auth/refresh`.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Profile
// =============================================================================

/// Body of `PUT /users/profile`. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Body of `POST /users/change-password`.
#[derive(Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl std::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordChange").finish_non_exhaustive()
    }
}

// =============================================================================
// Server cart
// =============================================================================

/// Body of `POST /cart/items`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AddToCartBody<'a> {
    pub product_id: &'a str,
    pub variant_id: &'a str,
    pub quantity: u32,
}

/// Body of `PUT /cart/items/{id}`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateCartItemBody {
    pub quantity: u32,
}

/// A line of the server cart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteCartItem {
    pub id: CartItemId,
    pub quantity: u32,
    pub product: Product,
    pub variant: ProductVariant,
}

impl From<RemoteCartItem> for CartItem {
    fn from(item: RemoteCartItem) -> Self {
        Self {
            id: item.id,
            product: item.product,
            variant: item.variant,
            quantity: item.quantity,
        }
    }
}

/// The canonical cart of an authenticated user.
///
/// Totals reported by the server are kept for display only; the cart
/// container always re-derives its own from the lines.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RemoteCartRepr")]
pub struct RemoteCart {
    pub id: Option<String>,
    pub items: Vec<RemoteCartItem>,
    pub total_amount: Option<Price>,
    pub total_items: Option<u32>,
}

impl RemoteCart {
    /// Convert the server lines into cart items.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items.into_iter().map(CartItem::from).collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RemoteCartRepr {
    Full {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        items: Vec<RemoteCartItem>,
        #[serde(default)]
        total_amount: Option<Price>,
        #[serde(default)]
        total_items: Option<u32>,
    },
    Lines(Vec<RemoteCartItem>),
}

impl From<RemoteCartRepr> for RemoteCart {
    fn from(repr: RemoteCartRepr) -> Self {
        match repr {
            RemoteCartRepr::Full {
                id,
                items,
                total_amount,
                total_items,
            } => Self {
                id,
                items,
                total_amount,
                total_items,
            },
            RemoteCartRepr::Lines(items) => Self {
                id: None,
                items,
                total_amount: None,
                total_items: None,
            },
        }
    }
}
