//! Zodiaco Core - Shared types library.
//!
//! This crate provides the types used across the Zodiaco storefront client:
//! - `storefront` - API client, cart state container, auth and checkout
//! - `cli` - Terminal front-end over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no storage. This keeps the cart reducer trivially testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices and emails
//! - [`catalog`] - Products, variants, categories and reviews
//! - [`account`] - Users, addresses and orders
//! - [`page`] - Paginated collections
//! - [`cart`] - Cart aggregate and its reducer

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod page;
pub mod types;

pub use account::{
    Address, AddressKind, AddressUpdate, NewAddress, NewOrder, NewOrderItem, Order, OrderItem,
    PostalAddress, User,
};
pub use cart::{Cart, CartAction, CartError, CartItem};
pub use catalog::{
    Category, Dimensions, NewReview, Product, ProductImage, ProductQuery, ProductVariant, Review,
};
pub use page::{Paginated, Pagination};
pub use types::*;
