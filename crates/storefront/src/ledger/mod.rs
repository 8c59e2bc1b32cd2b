//! Commerce ledger: session, cart, wallet and purchases.
//!
//! The ledger owns all mutable commerce state and writes it through a
//! [`StateStore`] after every change. Each mutating operation works on the
//! live state, saves it, and restores the prior snapshot if the save fails,
//! so callers only ever observe whole operations.
//!
//! Time comes from an injected [`mockable::Clock`].
//!
//! # Example
//!
//! ```rust,ignore
//! use promptos_storefront::ledger::{Ledger, LedgerSettings};
//! use promptos_storefront::storage::JsonFileStore;
//!
//! let mut ledger = Ledger::open(JsonFileStore::new("./data"), LedgerSettings::default())?;
//! ledger.login("an@example.com", "secret")?;
//! ledger.top_up_wallet(Decimal::new(100_000, 0))?;
//! ```

mod error;
mod models;

pub use error::LedgerError;
pub use models::*;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use promptos_core::{
    CartItemId, PaymentMethod, PromptId, PurchaseId, PurchaseStatus, TransactionKind, UserId,
    random_token,
};

use crate::storage::{PersistedState, StateStore};

/// Length of the random part of an access key.
const ACCESS_KEY_LEN: usize = 16;

/// Length of the random path segment of an access URL.
const ACCESS_PATH_LEN: usize = 9;

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// How the order was paid.
    pub method: PaymentMethod,
    /// Cart total at checkout.
    pub total: Decimal,
    /// Wallet debit, when paid from the wallet.
    pub transaction: Option<WalletTransaction>,
    /// One product per cart line, in cart order.
    pub purchases: Vec<PurchasedProduct>,
}

/// The commerce ledger.
pub struct Ledger<S> {
    store: S,
    clock: Arc<dyn Clock>,
    settings: LedgerSettings,
    state: LedgerState,
}

impl<S> std::fmt::Debug for Ledger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S: StateStore> Ledger<S> {
    /// Load the ledger from `store` using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if stored records cannot be read.
    pub fn open(store: S, settings: LedgerSettings) -> Result<Self, LedgerError> {
        Self::with_clock(store, settings, Arc::new(DefaultClock))
    }

    /// Load the ledger from `store` with an explicit clock.
    ///
    /// Missing records start from their defaults: no user, empty cart, no
    /// purchases, and a wallet holding the configured opening balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if stored records cannot be read.
    pub fn with_clock(
        store: S,
        settings: LedgerSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        let PersistedState {
            current_user,
            cart,
            purchases,
            wallet,
        } = store.load()?;

        let state = LedgerState {
            current_user,
            cart: cart.unwrap_or_default(),
            purchases: purchases.unwrap_or_default(),
            wallet: wallet.unwrap_or_else(|| {
                Wallet::opening(settings.starting_balance, settings.currency)
            }),
        };

        debug!(
            logged_in = state.current_user.is_some(),
            cart = state.cart.len(),
            purchases = state.purchases.len(),
            balance = %state.wallet.balance(),
            "Loaded ledger"
        );

        Ok(Self {
            store,
            clock,
            settings,
            state,
        })
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Apply `change` and persist, restoring the previous state on failure.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut LedgerState) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let snapshot = self.state.clone();

        let outcome = change(&mut self.state).and_then(|value| {
            self.store.save(&self.state)?;
            Ok(value)
        });

        if let Err(e) = &outcome {
            if !e.is_rejection() {
                warn!(error = %e, "Ledger save failed, rolled back");
            }
            self.state = snapshot;
        }
        outcome
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn current_user(&self) -> Option<&User> {
        self.state.current_user.as_ref()
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.state.current_user.is_some()
    }

    #[must_use]
    pub fn cart(&self) -> &[CartItem] {
        &self.state.cart
    }

    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.state.cart_total()
    }

    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.state.cart.len()
    }

    #[must_use]
    pub fn purchases(&self) -> &[PurchasedProduct] {
        &self.state.purchases
    }

    #[must_use]
    pub fn purchase(&self, id: &PurchaseId) -> Option<&PurchasedProduct> {
        self.state.purchases.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub const fn wallet(&self) -> &Wallet {
        &self.state.wallet
    }

    #[must_use]
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Status of `product` as of the ledger clock.
    #[must_use]
    pub fn effective_status(&self, product: &PurchasedProduct) -> PurchaseStatus {
        product.effective_status(self.now())
    }

    /// Whether the user owns `prompt_id`: a one-time purchase, or a
    /// subscription that is still active.
    #[must_use]
    pub fn has_purchased(&self, prompt_id: &PromptId) -> bool {
        let now = self.now();
        self.state
            .purchases
            .iter()
            .any(|p| &p.prompt_id == prompt_id && p.grants_access_at(now))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Sign in. Any non-empty email and password are accepted.
    ///
    /// The display name is the local part of the email.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EmptyCredentials`] if either field is empty.
    #[instrument(skip_all)]
    pub fn login(&mut self, email: &str, password: &str) -> Result<User, LedgerError> {
        if email.is_empty() || password.is_empty() {
            return Err(LedgerError::EmptyCredentials);
        }
        let name = email.split('@').next().unwrap_or(email);
        self.sign_in(email, name)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EmptyCredentials`] if any field is empty.
    #[instrument(skip_all)]
    pub fn register(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, LedgerError> {
        if email.is_empty() || password.is_empty() || name.is_empty() {
            return Err(LedgerError::EmptyCredentials);
        }
        self.sign_in(email, name)
    }

    fn sign_in(&mut self, email: &str, name: &str) -> Result<User, LedgerError> {
        let user = User {
            id: UserId::generate(),
            email: email.to_owned(),
            name: name.to_owned(),
            created_at: self.now(),
        };

        let signed_in = user.clone();
        self.commit(move |state| {
            state.current_user = Some(signed_in);
            Ok(())
        })?;

        info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    /// Sign out and empty the cart. Purchases and wallet are kept.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the state cannot be saved.
    #[instrument(skip(self))]
    pub fn logout(&mut self) -> Result<(), LedgerError> {
        self.commit(|state| {
            state.current_user = None;
            state.cart.clear();
            Ok(())
        })?;
        info!("User signed out");
        Ok(())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add a line to the cart, stamped with the ledger clock.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateCartItem`] if a line with the same
    /// prompt and plan is already present.
    #[instrument(skip(self, item), fields(prompt_id = %item.prompt.id))]
    pub fn add_to_cart(&mut self, mut item: CartItem) -> Result<CartItemId, LedgerError> {
        if self.state.cart.iter().any(|line| line.key() == item.key()) {
            return Err(LedgerError::DuplicateCartItem {
                prompt_id: item.prompt.id.clone(),
                plan_id: item.subscription_plan.as_ref().map(|plan| plan.id.clone()),
            });
        }

        item.added_at = self.now();
        let id = item.id.clone();
        debug!(cart_item_id = %id, "Adding to cart");
        self.commit(move |state| {
            state.cart.push(item);
            Ok(())
        })?;
        Ok(id)
    }

    /// Remove a line by id. Unknown ids are ignored.
    ///
    /// Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the state cannot be saved.
    #[instrument(skip(self))]
    pub fn remove_from_cart(&mut self, item_id: &CartItemId) -> Result<bool, LedgerError> {
        self.commit(|state| {
            let before = state.cart.len();
            state.cart.retain(|line| &line.id != item_id);
            Ok(state.cart.len() != before)
        })
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the state cannot be saved.
    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) -> Result<(), LedgerError> {
        self.commit(|state| {
            state.cart.clear();
            Ok(())
        })
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turn every cart line into a purchased product.
    ///
    /// Wallet payment debits the cart total as a single `purchase`
    /// transaction. Card payment is simulated and leaves the wallet alone.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotLoggedIn`] without a signed-in user
    /// - [`LedgerError::EmptyCart`] when there is nothing to buy
    /// - [`LedgerError::InsufficientFunds`] when the wallet cannot cover the total
    /// - [`LedgerError::InvalidPlanDuration`] when a plan's expiry cannot be represented
    #[instrument(skip(self))]
    pub fn complete_purchase(&mut self, method: PaymentMethod) -> Result<Receipt, LedgerError> {
        if !self.is_logged_in() {
            return Err(LedgerError::NotLoggedIn);
        }
        if self.state.cart.is_empty() {
            return Err(LedgerError::EmptyCart);
        }

        let total = self.cart_total();
        if method.is_wallet() && !self.state.wallet.can_afford(total) {
            warn!(balance = %self.state.wallet.balance(), %total, "Checkout refused");
            return Err(LedgerError::InsufficientFunds {
                balance: self.state.wallet.balance(),
                required: total,
            });
        }

        let now = self.now();
        let expiries = self
            .state
            .cart
            .iter()
            .map(|line| line_expiry(line, now))
            .collect::<Result<Vec<_>, _>>()?;
        let access_base = self.settings.access_base_url.trim_end_matches('/').to_owned();

        let receipt = self.commit(|state| {
            let transaction = method.is_wallet().then(|| {
                let tx = WalletTransaction::completed(
                    TransactionKind::Purchase,
                    -total,
                    "Prompt purchase",
                    now,
                );
                state.wallet.record(tx.clone());
                tx
            });

            let purchases: Vec<PurchasedProduct> = state
                .cart
                .drain(..)
                .zip(expiries)
                .map(|(line, expiry_date)| grant(line, expiry_date, now, &access_base))
                .collect();
            state.purchases.extend(purchases.iter().cloned());

            Ok(Receipt {
                method,
                total,
                transaction,
                purchases,
            })
        })?;

        info!(
            method = %method,
            %total,
            products = receipt.purchases.len(),
            "Checkout completed"
        );
        Ok(receipt)
    }

    /// Extend a product by one billing month, paid from the wallet.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotLoggedIn`] without a signed-in user
    /// - [`LedgerError::InvalidAmount`] for a non-positive price
    /// - [`LedgerError::InsufficientFunds`] when the wallet cannot cover `price`
    /// - [`LedgerError::ProductNotFound`] for an unknown product id
    /// - [`LedgerError::ExpiryOutOfRange`] when the new expiry cannot be represented
    #[instrument(skip(self))]
    pub fn renew_subscription(
        &mut self,
        product_id: &PurchaseId,
        price: Decimal,
    ) -> Result<PurchasedProduct, LedgerError> {
        if !self.is_logged_in() {
            return Err(LedgerError::NotLoggedIn);
        }
        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(price));
        }
        if !self.state.wallet.can_afford(price) {
            return Err(LedgerError::InsufficientFunds {
                balance: self.state.wallet.balance(),
                required: price,
            });
        }
        let index = self
            .state
            .purchases
            .iter()
            .position(|p| &p.id == product_id)
            .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))?;

        let now = self.now();
        let expiry = self
            .state
            .purchases
            .get(index)
            .and_then(|product| product.renewed_expiry(now))
            .ok_or_else(|| LedgerError::ExpiryOutOfRange(product_id.clone()))?;
        let renewed = self.commit(|state| {
            let product = state
                .purchases
                .get_mut(index)
                .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))?;
            state.wallet.record(WalletTransaction::completed(
                TransactionKind::Purchase,
                -price,
                format!("Renewal: {}", product.prompt_title),
                now,
            ));
            product.renew_until(expiry);
            Ok(product.clone())
        })?;

        info!(purchase_id = %renewed.id, expiry = ?renewed.expiry_date, "Subscription renewed");
        Ok(renewed)
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    /// Credit the wallet.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] for a non-positive amount.
    #[instrument(skip(self))]
    pub fn top_up_wallet(&mut self, amount: Decimal) -> Result<WalletTransaction, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let tx = WalletTransaction::completed(TransactionKind::Topup, amount, "Wallet top-up", self.now());
        let recorded = tx.clone();
        self.commit(move |state| {
            state.wallet.record(recorded);
            Ok(())
        })?;

        info!(%amount, balance = %self.state.wallet.balance(), "Wallet topped up");
        Ok(tx)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Store `expired` on every subscription whose expiry has passed.
    ///
    /// Saves only when something changed. Returns how many products moved.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the state cannot be saved.
    #[instrument(skip(self))]
    pub fn refresh_expired(&mut self) -> Result<usize, LedgerError> {
        let now = self.now();
        let lapsed = self
            .state
            .purchases
            .iter()
            .filter(|p| p.status == PurchaseStatus::Active)
            .filter(|p| p.effective_status(now) == PurchaseStatus::Expired)
            .count();
        if lapsed == 0 {
            return Ok(0);
        }

        self.commit(|state| {
            for product in &mut state.purchases {
                if product.effective_status(now) == PurchaseStatus::Expired {
                    product.status = PurchaseStatus::Expired;
                }
            }
            Ok(())
        })?;

        info!(count = lapsed, "Expired lapsed subscriptions");
        Ok(lapsed)
    }

    /// Drop everything back to a fresh ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the state cannot be saved.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Result<(), LedgerError> {
        let fresh = LedgerState::fresh(&self.settings);
        self.commit(move |state| {
            *state = fresh;
            Ok(())
        })?;
        info!("Ledger reset");
        Ok(())
    }
}

/// Expiry for a cart line bought at `now`: `None` for one-time lines.
fn line_expiry(
    line: &CartItem,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, LedgerError> {
    line.subscription_plan
        .as_ref()
        .map(|plan| {
            months_after(now, plan.duration_months()).ok_or_else(|| {
                LedgerError::InvalidPlanDuration {
                    plan_id: plan.id.clone(),
                    months: plan.duration_months(),
                }
            })
        })
        .transpose()
}

/// Build the owned product for a purchased cart line.
fn grant(
    line: CartItem,
    expiry_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    access_base: &str,
) -> PurchasedProduct {
    let price = line.price();
    let kind = line.kind();

    PurchasedProduct {
        id: PurchaseId::generate(),
        prompt_id: line.prompt.id,
        prompt_title: line.prompt.title,
        prompt_slug: line.prompt.slug,
        subscription_plan_id: line.subscription_plan.as_ref().map(|plan| plan.id.clone()),
        subscription_plan_title: line.subscription_plan.map(|plan| plan.title),
        purchase_date: now,
        expiry_date,
        access_key: format!("KEY-{}", random_token(ACCESS_KEY_LEN).to_ascii_uppercase()),
        access_url: format!("{access_base}/{}", random_token(ACCESS_PATH_LEN)),
        price,
        kind,
        status: PurchaseStatus::Active,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::{Local, TimeDelta, TimeZone};
    use promptos_core::{PurchaseKind, TransactionStatus};
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::catalog::{Prompt, SubscriptionPlan};
    use crate::storage::MemoryStore;

    /// Clock pinned to a settable instant.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(now),
            })
        }

        fn advance(&self, by: TimeDelta) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn vnd(amount: i64) -> Decimal {
        Decimal::new(amount, 0)
    }

    fn prompt(id: &str, price: i64) -> Prompt {
        serde_json::from_value(json!({
            "id": id,
            "slug": format!("{id}-slug"),
            "title": format!("Prompt {id}"),
            "metadata": { "price": price }
        }))
        .unwrap()
    }

    fn plan(id: &str, duration_months: u32, price: i64) -> SubscriptionPlan {
        serde_json::from_value(json!({
            "id": id,
            "slug": id,
            "title": format!("Plan {id}"),
            "metadata": { "duration_months": duration_months, "price": price }
        }))
        .unwrap()
    }

    struct Harness {
        ledger: Ledger<MemoryStore>,
        store: MemoryStore,
        clock: Arc<ManualClock>,
    }

    #[fixture]
    fn harness() -> Harness {
        let store = MemoryStore::new();
        let clock = ManualClock::at(start());
        let ledger =
            Ledger::with_clock(store.clone(), LedgerSettings::default(), clock.clone()).unwrap();
        Harness {
            ledger,
            store,
            clock,
        }
    }

    #[fixture]
    fn signed_in(mut harness: Harness) -> Harness {
        harness.ledger.login("buyer@example.com", "hunter2").unwrap();
        harness
    }

    fn assert_wallet_consistent(ledger: &Ledger<MemoryStore>) {
        let wallet = ledger.wallet();
        assert_eq!(
            wallet.balance(),
            ledger.settings().starting_balance + wallet.completed_total()
        );
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_fresh_ledger(harness: Harness) {
        let ledger = harness.ledger;
        assert!(!ledger.is_logged_in());
        assert_eq!(ledger.cart_count(), 0);
        assert!(ledger.purchases().is_empty());
        assert_eq!(ledger.wallet().balance(), vnd(500_000));
        assert!(ledger.wallet().transactions().is_empty());
    }

    #[rstest]
    fn test_login_derives_name(mut harness: Harness) {
        let user = harness.ledger.login("ana.dev@example.com", "pw").unwrap();
        assert_eq!(user.name, "ana.dev");
        assert_eq!(user.created_at, start());
        assert_eq!(harness.ledger.current_user(), Some(&user));
        assert_eq!(harness.store.records().current_user, Some(user));
    }

    #[rstest]
    #[case("", "pw")]
    #[case("a@b.c", "")]
    fn test_login_rejects_empty(mut harness: Harness, #[case] email: &str, #[case] password: &str) {
        let result = harness.ledger.login(email, password);
        assert!(matches!(result, Err(LedgerError::EmptyCredentials)));
        assert!(!harness.ledger.is_logged_in());
        assert_eq!(harness.store.saves(), 0);
    }

    #[rstest]
    fn test_register(mut harness: Harness) {
        assert!(matches!(
            harness.ledger.register("a@b.c", "pw", ""),
            Err(LedgerError::EmptyCredentials)
        ));
        let user = harness.ledger.register("a@b.c", "pw", "Ana").unwrap();
        assert_eq!(user.name, "Ana");
    }

    #[rstest]
    fn test_logout_keeps_wallet_and_purchases(mut signed_in: Harness) {
        let ledger = &mut signed_in.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 10_000), None)).unwrap();
        ledger.complete_purchase(PaymentMethod::Wallet).unwrap();
        ledger.add_to_cart(CartItem::new(prompt("p2", 10_000), None)).unwrap();

        ledger.logout().unwrap();

        assert!(!ledger.is_logged_in());
        assert_eq!(ledger.cart_count(), 0);
        assert_eq!(ledger.purchases().len(), 1);
        assert_eq!(ledger.wallet().balance(), vnd(490_000));
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_duplicate_cart_item_rejected(mut harness: Harness) {
        let ledger = &mut harness.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 1_000), None)).unwrap();
        let saves = harness.store.saves();

        let second = ledger.add_to_cart(CartItem::new(prompt("p1", 1_000), None));

        assert!(matches!(second, Err(LedgerError::DuplicateCartItem { .. })));
        assert_eq!(ledger.cart_count(), 1);
        assert_eq!(harness.store.saves(), saves);
    }

    #[rstest]
    fn test_same_prompt_different_plans(mut harness: Harness) {
        let ledger = &mut harness.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 1_000), None)).unwrap();
        ledger
            .add_to_cart(CartItem::new(prompt("p1", 1_000), Some(plan("m", 1, 5_000))))
            .unwrap();
        ledger
            .add_to_cart(CartItem::new(prompt("p1", 1_000), Some(plan("y", 12, 40_000))))
            .unwrap();

        assert_eq!(ledger.cart_count(), 3);
        assert_eq!(ledger.cart_total(), vnd(46_000));
    }

    #[rstest]
    fn test_cart_timestamp_comes_from_ledger_clock(mut harness: Harness) {
        let item = CartItem::added_at(prompt("p1", 1_000), None, start() - TimeDelta::days(400));
        harness.clock.advance(TimeDelta::hours(3));

        harness.ledger.add_to_cart(item).unwrap();
        harness
            .ledger
            .add_to_cart(CartItem::new(prompt("p2", 1_000), None))
            .unwrap();

        let stamped: Vec<_> = harness.ledger.cart().iter().map(|line| line.added_at).collect();
        assert_eq!(stamped, vec![start() + TimeDelta::hours(3); 2]);
    }

    #[rstest]
    fn test_remove_from_cart(mut harness: Harness) {
        let ledger = &mut harness.ledger;
        let id = ledger.add_to_cart(CartItem::new(prompt("p1", 1_000), None)).unwrap();

        assert!(!ledger.remove_from_cart(&CartItemId::new("missing")).unwrap());
        assert_eq!(ledger.cart_count(), 1);

        assert!(ledger.remove_from_cart(&id).unwrap());
        assert_eq!(ledger.cart_count(), 0);
    }

    #[rstest]
    fn test_clear_cart(mut harness: Harness) {
        let ledger = &mut harness.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 1_000), None)).unwrap();
        ledger.add_to_cart(CartItem::new(prompt("p2", 1_000), None)).unwrap();
        ledger.clear_cart().unwrap();
        assert_eq!(ledger.cart_total(), Decimal::ZERO);
        assert_eq!(harness.store.records().cart, Some(Vec::new()));
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_checkout_requires_login(mut harness: Harness) {
        harness
            .ledger
            .add_to_cart(CartItem::new(prompt("p1", 1_000), None))
            .unwrap();
        let result = harness.ledger.complete_purchase(PaymentMethod::Wallet);
        assert!(matches!(result, Err(LedgerError::NotLoggedIn)));
        assert_eq!(harness.ledger.cart_count(), 1);
    }

    #[rstest]
    fn test_checkout_empty_cart(mut signed_in: Harness) {
        let result = signed_in.ledger.complete_purchase(PaymentMethod::Wallet);
        assert!(matches!(result, Err(LedgerError::EmptyCart)));
    }

    #[rstest]
    fn test_checkout_insufficient_funds_changes_nothing(mut signed_in: Harness) {
        let ledger = &mut signed_in.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 400_000), None)).unwrap();
        ledger.add_to_cart(CartItem::new(prompt("p2", 200_000), None)).unwrap();
        let before = signed_in.store.records();

        let result = ledger.complete_purchase(PaymentMethod::Wallet);

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { balance, required })
                if balance == vnd(500_000) && required == vnd(600_000)
        ));
        assert_eq!(ledger.cart_count(), 2);
        assert!(ledger.purchases().is_empty());
        assert!(ledger.wallet().transactions().is_empty());
        assert_eq!(signed_in.store.records(), before);
    }

    #[rstest]
    #[case(4_000_000)]
    #[case(u32::MAX)]
    fn test_checkout_unrepresentable_plan_changes_nothing(
        mut signed_in: Harness,
        #[case] duration_months: u32,
    ) {
        let ledger = &mut signed_in.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 1_000), None)).unwrap();
        ledger
            .add_to_cart(CartItem::new(
                prompt("p2", 1_000),
                Some(plan("forever", duration_months, 10_000)),
            ))
            .unwrap();
        let before = signed_in.store.records();

        let result = ledger.complete_purchase(PaymentMethod::Wallet);

        assert!(matches!(
            result,
            Err(LedgerError::InvalidPlanDuration { plan_id, months })
                if plan_id.as_str() == "forever" && months == duration_months
        ));
        assert_eq!(ledger.cart_count(), 2);
        assert!(ledger.purchases().is_empty());
        assert!(ledger.wallet().transactions().is_empty());
        assert_eq!(ledger.wallet().balance(), vnd(500_000));
        assert_eq!(signed_in.store.records(), before);
    }

    #[rstest]
    fn test_checkout_with_wallet(mut signed_in: Harness) {
        let ledger = &mut signed_in.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 50_000), None)).unwrap();
        ledger
            .add_to_cart(CartItem::new(prompt("p2", 10_000), Some(plan("m", 1, 99_000))))
            .unwrap();
        let total = ledger.cart_total();

        let receipt = ledger.complete_purchase(PaymentMethod::Wallet).unwrap();

        assert_eq!(receipt.total, total);
        assert_eq!(receipt.purchases.len(), 2);
        assert_eq!(ledger.purchases().len(), 2);
        assert_eq!(ledger.cart_count(), 0);
        assert_eq!(ledger.wallet().balance(), vnd(500_000) - total);
        assert_eq!(ledger.wallet().transactions().len(), 1);

        let tx = &ledger.wallet().transactions()[0];
        assert_eq!(tx.kind, TransactionKind::Purchase);
        assert_eq!(tx.amount, -total);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.description, "Prompt purchase");
        assert_eq!(receipt.transaction.as_ref(), Some(tx));
        assert_wallet_consistent(ledger);
    }

    #[rstest]
    fn test_checkout_products(mut signed_in: Harness) {
        let ledger = &mut signed_in.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 50_000), None)).unwrap();
        ledger
            .add_to_cart(CartItem::new(prompt("p2", 10_000), Some(plan("m", 1, 99_000))))
            .unwrap();

        let receipt = ledger.complete_purchase(PaymentMethod::Wallet).unwrap();
        let (one_time, subscription) = (&receipt.purchases[0], &receipt.purchases[1]);

        assert_eq!(one_time.kind, PurchaseKind::OneTime);
        assert_eq!(one_time.expiry_date, None);
        assert_eq!(one_time.price, vnd(50_000));
        assert_eq!(one_time.prompt_slug, "p1-slug");
        assert!(one_time.access_key.starts_with("KEY-"));
        assert_eq!(one_time.access_key.len(), 4 + ACCESS_KEY_LEN);
        assert!(one_time.access_url.starts_with("https://api.promptos.com/access/"));

        assert_eq!(subscription.kind, PurchaseKind::Subscription);
        assert_eq!(subscription.price, vnd(99_000));
        assert_eq!(subscription.purchase_date, start());
        assert_eq!(subscription.expiry_date, Some(start() + TimeDelta::days(30)));
        assert_eq!(subscription.subscription_plan_title.as_deref(), Some("Plan m"));
        assert_eq!(subscription.status, PurchaseStatus::Active);
        assert_ne!(one_time.id, subscription.id);
    }

    #[rstest]
    fn test_checkout_with_card_leaves_wallet(mut signed_in: Harness) {
        let ledger = &mut signed_in.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 900_000), None)).unwrap();

        let receipt = ledger.complete_purchase(PaymentMethod::Card).unwrap();

        assert!(receipt.transaction.is_none());
        assert_eq!(ledger.wallet().balance(), vnd(500_000));
        assert!(ledger.has_purchased(&PromptId::new("p1")));
    }

    #[rstest]
    fn test_failed_save_rolls_back_checkout(mut signed_in: Harness) {
        let ledger = &mut signed_in.ledger;
        ledger.add_to_cart(CartItem::new(prompt("p1", 50_000), None)).unwrap();
        signed_in.store.fail_writes(true);

        let result = ledger.complete_purchase(PaymentMethod::Wallet);

        assert!(matches!(result, Err(LedgerError::Store(_))));
        assert!(!result.unwrap_err().is_rejection());
        assert_eq!(ledger.cart_count(), 1);
        assert!(ledger.purchases().is_empty());
        assert_eq!(ledger.wallet().balance(), vnd(500_000));
        assert!(ledger.wallet().transactions().is_empty());
    }

    // -------------------------------------------------------------------------
    // Wallet
    // -------------------------------------------------------------------------

    #[rstest]
    #[case(0)]
    #[case(-5)]
    fn test_top_up_rejects_non_positive(mut harness: Harness, #[case] amount: i64) {
        let result = harness.ledger.top_up_wallet(vnd(amount));
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert!(harness.ledger.wallet().transactions().is_empty());
    }

    #[rstest]
    fn test_top_up_then_buy(mut signed_in: Harness) {
        let ledger = &mut signed_in.ledger;

        let topup = ledger.top_up_wallet(vnd(100_000)).unwrap();
        assert_eq!(ledger.wallet().balance(), vnd(600_000));
        assert_eq!(topup.kind, TransactionKind::Topup);
        assert_eq!(topup.amount, vnd(100_000));
        assert_eq!(topup.status, TransactionStatus::Completed);
        assert_eq!(topup.description, "Wallet top-up");

        ledger.add_to_cart(CartItem::new(prompt("p1", 50_000), None)).unwrap();
        ledger.complete_purchase(PaymentMethod::Wallet).unwrap();

        assert_eq!(ledger.wallet().balance(), vnd(550_000));
        assert_eq!(ledger.purchases().len(), 1);
        assert_eq!(ledger.cart_count(), 0);
        let last = ledger.wallet().transactions().last().unwrap();
        assert_eq!(last.kind, TransactionKind::Purchase);
        assert_eq!(last.amount, vnd(-50_000));
        assert_wallet_consistent(ledger);
    }

    // -------------------------------------------------------------------------
    // Renewal and expiry
    // -------------------------------------------------------------------------

    fn subscribe(harness: &mut Harness, months: u32) -> PurchaseId {
        harness
            .ledger
            .add_to_cart(CartItem::new(prompt("p9", 0), Some(plan("m", months, 20_000))))
            .unwrap();
        let receipt = harness.ledger.complete_purchase(PaymentMethod::Wallet).unwrap();
        receipt.purchases[0].id.clone()
    }

    #[rstest]
    fn test_renew_extends_from_prior_expiry(mut signed_in: Harness) {
        let id = subscribe(&mut signed_in, 1);
        let expiry = signed_in.ledger.purchase(&id).unwrap().expiry_date.unwrap();

        let renewed = signed_in.ledger.renew_subscription(&id, vnd(20_000)).unwrap();

        assert_eq!(renewed.expiry_date, Some(expiry + TimeDelta::days(30)));
        assert_eq!(renewed.status, PurchaseStatus::Active);
        let tx = signed_in.ledger.wallet().transactions().last().unwrap();
        assert_eq!(tx.description, "Renewal: Prompt p9");
        assert_eq!(tx.amount, vnd(-20_000));
        assert_wallet_consistent(&signed_in.ledger);
    }

    #[rstest]
    fn test_renew_lapsed_subscription(mut signed_in: Harness) {
        let id = subscribe(&mut signed_in, 1);
        signed_in.clock.advance(TimeDelta::days(45));
        assert_eq!(signed_in.ledger.refresh_expired().unwrap(), 1);
        assert_eq!(
            signed_in.ledger.purchase(&id).unwrap().status,
            PurchaseStatus::Expired
        );

        let renewed = signed_in.ledger.renew_subscription(&id, vnd(20_000)).unwrap();

        // Extends from the old expiry, which is still in the past.
        assert_eq!(renewed.expiry_date, Some(start() + TimeDelta::days(60)));
        assert_eq!(renewed.status, PurchaseStatus::Active);
    }

    #[rstest]
    fn test_renew_one_time_starts_from_now(mut signed_in: Harness) {
        signed_in
            .ledger
            .add_to_cart(CartItem::new(prompt("p1", 1_000), None))
            .unwrap();
        let receipt = signed_in.ledger.complete_purchase(PaymentMethod::Card).unwrap();
        signed_in.clock.advance(TimeDelta::days(2));

        let renewed = signed_in
            .ledger
            .renew_subscription(&receipt.purchases[0].id, vnd(1_000))
            .unwrap();

        assert_eq!(
            renewed.expiry_date,
            Some(start() + TimeDelta::days(2) + TimeDelta::days(30))
        );
    }

    #[rstest]
    fn test_renew_rejections(mut harness: Harness) {
        let missing = PurchaseId::new("nope");
        assert!(matches!(
            harness.ledger.renew_subscription(&missing, vnd(1)),
            Err(LedgerError::NotLoggedIn)
        ));

        harness.ledger.login("a@b.c", "pw").unwrap();
        assert!(matches!(
            harness.ledger.renew_subscription(&missing, Decimal::ZERO),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            harness.ledger.renew_subscription(&missing, vnd(1_000_000)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            harness.ledger.renew_subscription(&missing, vnd(1)),
            Err(LedgerError::ProductNotFound(id)) if id == missing
        ));
        assert!(harness.ledger.wallet().transactions().is_empty());
    }

    #[rstest]
    fn test_has_purchased_follows_expiry(mut signed_in: Harness) {
        let id = subscribe(&mut signed_in, 1);
        let prompt_id = PromptId::new("p9");
        assert!(signed_in.ledger.has_purchased(&prompt_id));
        assert!(!signed_in.ledger.has_purchased(&PromptId::new("other")));

        signed_in.clock.advance(TimeDelta::days(30));

        let product = signed_in.ledger.purchase(&id).unwrap().clone();
        assert_eq!(product.status, PurchaseStatus::Active);
        assert_eq!(
            signed_in.ledger.effective_status(&product),
            PurchaseStatus::Expired
        );
        assert!(!signed_in.ledger.has_purchased(&prompt_id));
    }

    #[rstest]
    fn test_refresh_expired_without_changes_skips_save(mut signed_in: Harness) {
        subscribe(&mut signed_in, 12);
        let saves = signed_in.store.saves();

        assert_eq!(signed_in.ledger.refresh_expired().unwrap(), 0);
        assert_eq!(signed_in.store.saves(), saves);
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_reopen_restores_state(mut signed_in: Harness) {
        signed_in.ledger.top_up_wallet(vnd(1_000)).unwrap();
        subscribe(&mut signed_in, 1);
        signed_in
            .ledger
            .add_to_cart(CartItem::new(prompt("p2", 5_000), None))
            .unwrap();

        let reopened = Ledger::with_clock(
            signed_in.store.clone(),
            LedgerSettings::default(),
            signed_in.clock.clone(),
        )
        .unwrap();

        assert_eq!(reopened.current_user(), signed_in.ledger.current_user());
        assert_eq!(reopened.cart(), signed_in.ledger.cart());
        assert_eq!(reopened.purchases(), signed_in.ledger.purchases());
        assert_eq!(reopened.wallet(), signed_in.ledger.wallet());
    }

    #[rstest]
    fn test_reset(mut signed_in: Harness) {
        signed_in.ledger.top_up_wallet(vnd(1_000)).unwrap();
        subscribe(&mut signed_in, 1);

        signed_in.ledger.reset().unwrap();

        assert!(!signed_in.ledger.is_logged_in());
        assert!(signed_in.ledger.purchases().is_empty());
        assert_eq!(signed_in.ledger.wallet().balance(), vnd(500_000));
        assert!(signed_in.ledger.wallet().transactions().is_empty());
    }

    #[test]
    fn test_wallet_invariant_over_sequence() {
        let mut h = harness();
        h.ledger.login("a@b.c", "pw").unwrap();

        for step in 0..6_i64 {
            h.ledger.top_up_wallet(vnd(1_000 * (step + 1))).unwrap();
            h.ledger
                .add_to_cart(CartItem::new(prompt(&format!("p{step}"), 3_000), None))
                .unwrap();
            h.ledger.complete_purchase(PaymentMethod::Wallet).unwrap();
            let _ = h.ledger.top_up_wallet(vnd(-1));
            assert_wallet_consistent(&h.ledger);
        }
        assert_eq!(h.ledger.purchases().len(), 6);
    }
}
