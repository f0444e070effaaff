//! Subcommand implementations.
//!
//! Each command talks to the [`Storefront`](zodiaco_storefront::Storefront)
//! and returns the text to print; `main` owns stdout and stderr.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;
