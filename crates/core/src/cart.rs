//! Shopping cart aggregate and reducer.
//!
//! A [`Cart`] is an ordered list of [`CartItem`] lines keyed by
//! `(product id, variant id)`. The totals are private and re-derived from the
//! line list every time it changes, so they can never go stale.
//!
//! All mutations go through [`Cart::apply`], which dispatches over the
//! [`CartAction`] variants. The reducer is pure: persistence and network
//! synchronization are layered on top by the storefront crate.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut cart = Cart::default();
//! cart.apply(CartAction::Add { product, variant_id, quantity: 1 })?;
//! assert_eq!(cart.total_items(), 1);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::NewOrderItem;
use crate::catalog::{Product, ProductVariant};
use crate::types::{CartItemId, Price, ProductId, VariantId};

/// Errors produced by cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The requested variant does not exist on the product.
    #[error("Variant not found")]
    VariantNotFound(VariantId),

    /// A line cannot be added with zero units.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// Adding would overflow the line quantity.
    #[error("Quantity is too large")]
    QuantityOverflow,

    /// The cart total does not fit in a price.
    #[error("Cart total is too large")]
    AmountOverflow,

    /// The server or local storage rejected the mutation.
    #[error("{0}")]
    Persistence(String),
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line ID. Server lines carry the server's ID; guest lines use
    /// `{product_id}-{variant_id}`.
    pub id: CartItemId,
    pub product: Product,
    pub variant: ProductVariant,
    pub quantity: u32,
}

impl CartItem {
    /// Build a guest line for a product variant.
    #[must_use]
    pub fn new(product: Product, variant: ProductVariant, quantity: u32) -> Self {
        let id = CartItemId::new(format!("{}-{}", product.id, variant.id));
        Self {
            id,
            product,
            variant,
            quantity,
        }
    }

    /// Whether this line is for the given product variant.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, variant_id: &VariantId) -> bool {
        &self.product.id == product_id && &self.variant.id == variant_id
    }

    /// Variant price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.variant.price * self.quantity
    }
}

/// A cart mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Replace every line (initial load or server response).
    Load(Vec<CartItem>),
    /// Add `quantity` units of a product variant.
    Add {
        product: Product,
        variant_id: VariantId,
        quantity: u32,
    },
    /// Remove the line for a product variant.
    Remove {
        product_id: ProductId,
        variant_id: VariantId,
    },
    /// Set the quantity of a line. Negative values clamp to zero, and zero
    /// removes the line.
    UpdateQuantity {
        product_id: ProductId,
        variant_id: VariantId,
        quantity: i64,
    },
    /// Remove every line.
    Clear,
}

impl CartAction {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::UpdateQuantity { .. } => "update_quantity",
            Self::Clear => "clear",
        }
    }
}

/// Clamp a requested quantity into the `u32` range, treating negatives as 0.
#[must_use]
pub fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(0)).unwrap_or(u32::MAX)
}

/// The cart aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
    total_amount: Price,
    total_items: u32,
}

impl Cart {
    /// Build a cart from existing lines, dropping any with zero quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AmountOverflow`] if the lines cannot be totalled.
    pub fn from_items(items: Vec<CartItem>) -> Result<Self, CartError> {
        let mut cart = Self::default();
        cart.replace(items)?;
        Ok(cart)
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Sum of variant price times quantity over all lines.
    #[must_use]
    pub const fn total_amount(&self) -> Price {
        self.total_amount
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub const fn total_items(&self) -> u32 {
        self.total_items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line for a product variant.
    #[must_use]
    pub fn find(&self, product_id: &ProductId, variant_id: &VariantId) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|item| item.matches(product_id, variant_id))
    }

    /// Lines in the shape expected by `POST /orders`.
    #[must_use]
    pub fn order_items(&self) -> Vec<NewOrderItem> {
        self.items
            .iter()
            .map(|item| NewOrderItem {
                product_id: item.product.id.clone(),
                variant_id: item.variant.id.clone(),
                quantity: item.quantity,
            })
            .collect()
    }

    /// Apply a mutation.
    ///
    /// On error the cart is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`CartError::VariantNotFound`] if an `Add` names a variant the
    ///   product does not have.
    /// - [`CartError::InvalidQuantity`] if an `Add` has zero quantity.
    /// - [`CartError::QuantityOverflow`] if an `Add` would overflow `u32`.
    /// - [`CartError::AmountOverflow`] if the new total does not fit.
    pub fn apply(&mut self, action: CartAction) -> Result<(), CartError> {
        let mut next = self.clone();
        next.dispatch(action)?;
        *self = next;
        Ok(())
    }

    fn dispatch(&mut self, action: CartAction) -> Result<(), CartError> {
        match action {
            CartAction::Load(items) => self.replace(items),
            CartAction::Add {
                product,
                variant_id,
                quantity,
            } => self.add(product, &variant_id, quantity),
            CartAction::Remove {
                product_id,
                variant_id,
            } => self.remove(&product_id, &variant_id),
            CartAction::UpdateQuantity {
                product_id,
                variant_id,
                quantity,
            } => self.update_quantity(&product_id, &variant_id, quantity),
            CartAction::Clear => self.replace(Vec::new()),
        }
    }

    fn add(
        &mut self,
        product: Product,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        let Some(variant) = product.variant(variant_id).cloned() else {
            return Err(CartError::VariantNotFound(variant_id.clone()));
        };
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|item| item.matches(&product.id, variant_id))
        {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityOverflow)?;
        } else {
            self.items.push(CartItem::new(product, variant, quantity));
        }

        self.recompute()
    }

    fn remove(&mut self, product_id: &ProductId, variant_id: &VariantId) -> Result<(), CartError> {
        self.items
            .retain(|item| !item.matches(product_id, variant_id));
        self.recompute()
    }

    fn update_quantity(
        &mut self,
        product_id: &ProductId,
        variant_id: &VariantId,
        quantity: i64,
    ) -> Result<(), CartError> {
        let quantity = clamp_quantity(quantity);
        for item in &mut self.items {
            if item.matches(product_id, variant_id) {
                item.quantity = quantity;
            }
        }
        self.items.retain(|item| item.quantity > 0);
        self.recompute()
    }

    fn replace(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        self.items = items;
        self.items.retain(|item| item.quantity > 0);
        self.recompute()
    }

    fn recompute(&mut self) -> Result<(), CartError> {
        self.total_amount = self.items.iter().try_fold(Price::ZERO, |acc, item| {
            item.variant
                .price
                .checked_times(item.quantity)
                .and_then(|line| acc.checked_add(line))
                .ok_or(CartError::AmountOverflow)
        })?;
        self.total_items = self
            .items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity));
        Ok(())
    }
}
