//! Core types for PromptOS.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod status;

pub use id::*;
pub use price::{CurrencyCode, ParseCurrencyError, Price};
pub use status::*;
