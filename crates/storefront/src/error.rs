//! Unified error type for the storefront library.
//!
//! Each layer has its own error enum; [`Error`] wraps them so callers that
//! drive several layers (the CLI) can use a single `Result`.

use thiserror::Error;

use crate::catalog::{CatalogError, ContentError};
use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::storage::StoreError;

/// Storefront error.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog read failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Content store could not be set up.
    #[error("Content store error: {0}")]
    Content(#[from] ContentError),

    /// Ledger refused or failed an operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Ledger storage failed outside an operation.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Input that could not be interpreted.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    /// Whether the error points at a fault worth reporting to error tracking,
    /// as opposed to a refused request.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        match self {
            Self::Ledger(e) => !e.is_rejection(),
            Self::BadRequest(_) => false,
            Self::Config(_) | Self::Catalog(_) | Self::Content(_) | Self::Store(_) => true,
        }
    }
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
