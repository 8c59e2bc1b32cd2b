//! PromptOS Core - Shared types library.
//!
//! This crate provides common types used across all PromptOS components:
//! - `storefront` - Catalog adapter and commerce ledger
//! - `cli` - Command-line front end for browsing and buying prompts
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no persistence,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Opaque entity IDs, money amounts, and ledger statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
