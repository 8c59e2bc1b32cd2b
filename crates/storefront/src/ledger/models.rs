//! Ledger domain types.
//!
//! Serialized field names follow the stored ledger format (`camelCase`, with
//! `type` for kinds and `date` for transaction timestamps).

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use promptos_core::{
    CartItemId, CurrencyCode, PlanId, Price, PromptId, PurchaseId, PurchaseKind, PurchaseStatus,
    TransactionId, TransactionKind, TransactionStatus, UserId,
};

use crate::catalog::{Prompt, SubscriptionPlan};

/// Days in one billing month.
///
/// Subscription arithmetic uses fixed 30-day blocks, not calendar months.
pub const DAYS_PER_MONTH: i64 = 30;

/// Length of `months` billing months, or `None` past the representable range.
#[must_use]
pub fn months(months: u32) -> Option<TimeDelta> {
    TimeDelta::try_days(DAYS_PER_MONTH * i64::from(months))
}

/// `start` plus `count` billing months, or `None` on overflow.
#[must_use]
pub fn months_after(start: DateTime<Utc>, count: u32) -> Option<DateTime<Utc>> {
    start.checked_add_signed(months(count)?)
}

// =============================================================================
// User
// =============================================================================

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cart
// =============================================================================

/// A cart line: one prompt, optionally under a subscription plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub prompt: Prompt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<SubscriptionPlan>,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Build a cart line with a fresh id, added now.
    #[must_use]
    pub fn new(prompt: Prompt, subscription_plan: Option<SubscriptionPlan>) -> Self {
        Self::added_at(prompt, subscription_plan, Utc::now())
    }

    /// Build a cart line with a fresh id and an explicit timestamp.
    #[must_use]
    pub fn added_at(
        prompt: Prompt,
        subscription_plan: Option<SubscriptionPlan>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CartItemId::generate(),
            prompt,
            subscription_plan,
            added_at,
        }
    }

    /// Uniqueness key: prompt plus plan, where "no plan" is its own key.
    #[must_use]
    pub fn key(&self) -> (&PromptId, Option<&PlanId>) {
        (
            &self.prompt.id,
            self.subscription_plan.as_ref().map(|plan| &plan.id),
        )
    }

    /// Line price: the plan price when subscribing, else the prompt price.
    #[must_use]
    pub fn price(&self) -> Decimal {
        self.subscription_plan
            .as_ref()
            .map_or_else(|| self.prompt.price(), SubscriptionPlan::price)
    }

    #[must_use]
    pub const fn kind(&self) -> PurchaseKind {
        if self.subscription_plan.is_some() {
            PurchaseKind::Subscription
        } else {
            PurchaseKind::OneTime
        }
    }
}

// =============================================================================
// Wallet
// =============================================================================

/// A single balance change. Never edited after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Signed amount: negative for purchases, positive for top-ups.
    pub amount: Decimal,
    pub description: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl WalletTransaction {
    /// A settled transaction.
    #[must_use]
    pub fn completed(
        kind: TransactionKind,
        amount: Decimal,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            kind,
            amount,
            description: description.into(),
            timestamp,
            status: TransactionStatus::Completed,
        }
    }
}

/// The user's wallet.
///
/// The balance only moves through [`Wallet::record`], so it always equals the
/// opening balance plus the sum of completed transaction amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    balance: Decimal,
    currency: CurrencyCode,
    transactions: Vec<WalletTransaction>,
}

impl Wallet {
    /// A wallet holding `balance` with no history.
    #[must_use]
    pub const fn opening(balance: Decimal, currency: CurrencyCode) -> Self {
        Self {
            balance,
            currency,
            transactions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn balance(&self) -> Decimal {
        self.balance
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Balance with its currency, for display.
    #[must_use]
    pub const fn balance_price(&self) -> Price {
        Price::new(self.balance, self.currency)
    }

    /// Transactions in the order they were recorded.
    #[must_use]
    pub fn transactions(&self) -> &[WalletTransaction] {
        &self.transactions
    }

    /// Sum of completed transaction amounts.
    #[must_use]
    pub fn completed_total(&self) -> Decimal {
        self.transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .map(|tx| tx.amount)
            .sum()
    }

    #[must_use]
    pub fn can_afford(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Append a transaction, applying it to the balance if completed.
    pub(crate) fn record(&mut self, transaction: WalletTransaction) {
        if transaction.status == TransactionStatus::Completed {
            self.balance += transaction.amount;
        }
        self.transactions.push(transaction);
    }
}

// =============================================================================
// Purchases
// =============================================================================

/// A prompt the user owns.
///
/// Prompt and plan titles are copied at purchase time so the record stays
/// readable after the catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedProduct {
    pub id: PurchaseId,
    pub prompt_id: PromptId,
    pub prompt_title: String,
    pub prompt_slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_plan_id: Option<PlanId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_plan_title: Option<String>,
    pub purchase_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub access_key: String,
    pub access_url: String,
    pub price: Decimal,
    #[serde(rename = "type")]
    pub kind: PurchaseKind,
    pub status: PurchaseStatus,
}

impl PurchasedProduct {
    #[must_use]
    pub const fn is_subscription(&self) -> bool {
        matches!(self.kind, PurchaseKind::Subscription)
    }

    /// Status as of `now`.
    ///
    /// A subscription whose expiry has passed reads as expired even while the
    /// stored status still says active.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> PurchaseStatus {
        match (self.kind, self.status, self.expiry_date) {
            (PurchaseKind::Subscription, PurchaseStatus::Active, Some(expiry)) if expiry <= now => {
                PurchaseStatus::Expired
            }
            (_, status, _) => status,
        }
    }

    /// Whether the product gives access to its prompt at `now`.
    #[must_use]
    pub fn grants_access_at(&self, now: DateTime<Utc>) -> bool {
        match self.kind {
            PurchaseKind::OneTime => true,
            PurchaseKind::Subscription => self.effective_status(now) == PurchaseStatus::Active,
        }
    }

    /// Expiry after one more billing month, counted from the current expiry
    /// (or from `now` when there is none). `None` on overflow.
    #[must_use]
    pub fn renewed_expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        months_after(self.expiry_date.unwrap_or(now), 1)
    }

    /// Set a new expiry and mark the product active.
    pub(crate) fn renew_until(&mut self, expiry: DateTime<Utc>) {
        self.expiry_date = Some(expiry);
        self.status = PurchaseStatus::Active;
    }
}

// =============================================================================
// Ledger State
// =============================================================================

/// Opening values for a fresh ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Wallet balance before any transaction.
    pub starting_balance: Decimal,
    /// Wallet currency.
    pub currency: CurrencyCode,
    /// Base for generated access URLs.
    pub access_base_url: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::new(500_000, 0),
            currency: CurrencyCode::VND,
            access_base_url: "https://api.promptos.com/access".to_owned(),
        }
    }
}

/// Everything the ledger owns. Loaded and saved as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    pub current_user: Option<User>,
    pub cart: Vec<CartItem>,
    pub purchases: Vec<PurchasedProduct>,
    pub wallet: Wallet,
}

impl LedgerState {
    /// State of a ledger that has never been used.
    #[must_use]
    pub fn fresh(settings: &LedgerSettings) -> Self {
        Self {
            current_user: None,
            cart: Vec::new(),
            purchases: Vec::new(),
            wallet: Wallet::opening(settings.starting_balance, settings.currency),
        }
    }

    /// Sum of cart line prices.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.cart.iter().map(CartItem::price).sum()
    }
}
