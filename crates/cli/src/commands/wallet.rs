//! Wallet and purchase history commands.

use rust_decimal::Decimal;
use tracing::info;

use promptos_core::{Price, PurchaseId};
use promptos_storefront::Error;
use promptos_storefront::ledger::Ledger;
use promptos_storefront::storage::JsonFileStore;

fn parse_amount(raw: &str) -> promptos_storefront::Result<Decimal> {
    raw.parse()
        .map_err(|_| Error::BadRequest(format!("not an amount: {raw}")))
}

pub fn show(ledger: &Ledger<JsonFileStore>) {
    let wallet = ledger.wallet();
    info!(balance = %wallet.balance_price(), "Wallet");
    for tx in wallet.transactions() {
        info!(
            id = %tx.id,
            kind = %tx.kind,
            amount = %Price::new(tx.amount, wallet.currency()),
            status = %tx.status,
            at = %tx.timestamp,
            "{}",
            tx.description
        );
    }
}

pub fn top_up(ledger: &mut Ledger<JsonFileStore>, amount: &str) -> promptos_storefront::Result<()> {
    let amount = parse_amount(amount)?;
    ledger.top_up_wallet(amount)?;
    info!(balance = %ledger.wallet().balance_price(), "Wallet topped up");
    Ok(())
}

pub fn purchases(ledger: &Ledger<JsonFileStore>) {
    if ledger.purchases().is_empty() {
        info!("No purchases yet");
        return;
    }
    let currency = ledger.wallet().currency();
    for product in ledger.purchases() {
        info!(
            id = %product.id,
            kind = %product.kind,
            status = %ledger.effective_status(product),
            plan = product.subscription_plan_title.as_deref().unwrap_or("-"),
            expires = ?product.expiry_date,
            price = %Price::new(product.price, currency),
            key = %product.access_key,
            "{}",
            product.prompt_title
        );
    }
}

pub fn renew(
    ledger: &mut Ledger<JsonFileStore>,
    product_id: &str,
    price: &str,
) -> promptos_storefront::Result<()> {
    let price = parse_amount(price)?;
    let product = ledger.renew_subscription(&PurchaseId::new(product_id), price)?;
    info!(
        id = %product.id,
        expires = ?product.expiry_date,
        balance = %ledger.wallet().balance_price(),
        "Renewed {}",
        product.prompt_title
    );
    Ok(())
}

pub fn sweep(ledger: &mut Ledger<JsonFileStore>) -> promptos_storefront::Result<()> {
    let count = ledger.refresh_expired()?;
    info!(count, "Marked lapsed subscriptions expired");
    Ok(())
}

pub fn reset(ledger: &mut Ledger<JsonFileStore>) -> promptos_storefront::Result<()> {
    ledger.reset()?;
    crate::telemetry::clear_sentry_user();
    info!("Ledger reset");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100000").unwrap(), Decimal::new(100_000, 0));
        assert_eq!(parse_amount("19.99").unwrap(), Decimal::new(1999, 2));
        assert!(matches!(parse_amount("lots"), Err(Error::BadRequest(_))));
    }
}
