//! PromptOS Storefront library.
//!
//! Two layers make up the storefront core:
//!
//! - [`catalog`] - read-only adapter over the Cosmic content API, returning
//!   prompts, categories and subscription plans.
//! - [`ledger`] - the commerce ledger owning identity, cart, wallet and
//!   purchased products, persisted through a [`storage::StateStore`].
//!
//! The ledger never calls the catalog. Callers fetch catalog records and hand
//! them to the ledger as opaque inputs (see [`ledger::CartItem::new`]).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod storage;

pub use error::{Error, Result};
