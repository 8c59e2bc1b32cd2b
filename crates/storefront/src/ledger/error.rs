//! Ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;

use promptos_core::{PlanId, PromptId, PurchaseId};

use crate::storage::StoreError;

/// Errors from ledger operations.
///
/// Every variant leaves the ledger state as it was before the call.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Email, password and name must not be empty")]
    EmptyCredentials,

    #[error("No user is signed in")]
    NotLoggedIn,

    #[error("Prompt {prompt_id} is already in the cart{}", plan_suffix(.plan_id.as_ref()))]
    DuplicateCartItem {
        prompt_id: PromptId,
        plan_id: Option<PlanId>,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Plan {plan_id} has an unusable duration of {months} months")]
    InvalidPlanDuration { plan_id: PlanId, months: u32 },

    #[error("Renewing {0} would push its expiry out of range")]
    ExpiryOutOfRange(PurchaseId),

    #[error("Purchased product not found: {0}")]
    ProductNotFound(PurchaseId),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

fn plan_suffix(plan_id: Option<&PlanId>) -> String {
    plan_id.map_or_else(String::new, |plan| format!(" with plan {plan}"))
}

impl LedgerError {
    /// Whether the operation was refused by a business rule, as opposed to
    /// failing in storage.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
