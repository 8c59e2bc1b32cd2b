//! Durable storage for ledger state.
//!
//! The ledger persists four records, each as its own JSON document:
//!
//! - `currentUser` - the signed-in user (absent when signed out)
//! - `cartItems` - cart lines
//! - `purchasedProducts` - owned prompts
//! - `wallet` - balance, currency and transaction history
//!
//! [`JsonFileStore`] keeps them as files in a data directory. [`MemoryStore`]
//! keeps them in process, for tests and ephemeral sessions.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use thiserror::Error;

use crate::ledger::{CartItem, LedgerState, PurchasedProduct, User, Wallet};

/// Names of the persisted records.
pub mod records {
    pub const CURRENT_USER: &str = "currentUser";
    pub const CART_ITEMS: &str = "cartItems";
    pub const PURCHASED_PRODUCTS: &str = "purchasedProducts";
    pub const WALLET: &str = "wallet";
}

/// Errors from a state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt record in {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {record}: {source}")]
    Encode {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Records as read from storage. Missing records are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub current_user: Option<User>,
    pub cart: Option<Vec<CartItem>>,
    pub purchases: Option<Vec<PurchasedProduct>>,
    pub wallet: Option<Wallet>,
}

impl From<&LedgerState> for PersistedState {
    fn from(state: &LedgerState) -> Self {
        Self {
            current_user: state.current_user.clone(),
            cart: Some(state.cart.clone()),
            purchases: Some(state.purchases.clone()),
            wallet: Some(state.wallet.clone()),
        }
    }
}

/// Load and save the whole ledger state.
///
/// `save` writes every record; a store that cannot write must return an error
/// so the ledger can roll back.
pub trait StateStore {
    /// Read whatever records exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a record exists but cannot be read or parsed.
    fn load(&self) -> Result<PersistedState, StoreError>;

    /// Persist the full state.
    ///
    /// # Errors
    ///
    /// Returns an error if any record cannot be written.
    fn save(&self, state: &LedgerState) -> Result<(), StoreError>;
}
