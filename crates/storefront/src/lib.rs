//! Zodiaco Storefront library.
//!
//! Client side of the Zodiaco store: a typed wrapper over the REST API, the
//! shopping-cart state container with guest and server persistence, the
//! customer session and checkout. Front-ends build one [`Storefront`] and
//! read everything through it.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`storage`] - Local durable key-value storage
//! - [`api`] - REST API client
//! - [`cart`] - Cart state container and persistence strategies
//! - [`forms`] - Login, registration and checkout forms
//! - [`auth`] - Customer session
//! - [`checkout`] - Order placement
//! - [`error`] - Unified error type and Sentry helpers
//! - [`state`] - The injectable session object

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod forms;
pub mod state;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthSession, AuthState};
pub use cart::{CartState, CartStore};
pub use checkout::{Checkout, CheckoutError, OrderSummary};
pub use config::StorefrontConfig;
pub use error::StorefrontError;
pub use forms::{CheckoutForm, FormError, LoginForm, PaymentMethod, RegisterForm};
pub use state::Storefront;
pub use storage::{FileStorage, LocalStorage, MemoryStorage, SharedStorage};
