//! Cart and checkout commands.

use tracing::info;

use promptos_core::{CartItemId, PaymentMethod, PlanId, Price};
use promptos_storefront::Error;
use promptos_storefront::catalog::Catalog;
use promptos_storefront::ledger::{CartItem, Ledger};
use promptos_storefront::storage::JsonFileStore;

use super::Source;
use crate::telemetry;

pub fn show(ledger: &Ledger<JsonFileStore>) {
    let currency = ledger.wallet().currency();
    if ledger.cart().is_empty() {
        info!("Cart is empty");
        return;
    }
    for line in ledger.cart() {
        info!(
            id = %line.id,
            plan = line.subscription_plan.as_ref().map_or("one-time", |p| p.title.as_str()),
            price = %Price::new(line.price(), currency),
            "{}",
            line.prompt.title
        );
    }
    info!(
        items = ledger.cart_count(),
        total = %Price::new(ledger.cart_total(), currency),
        "Cart total"
    );
}

/// Look up a prompt (and plan) in the catalog and add it to the cart.
pub async fn add(
    ledger: &mut Ledger<JsonFileStore>,
    catalog: &Catalog<Source>,
    slug: &str,
    plan_id: Option<String>,
) -> promptos_storefront::Result<()> {
    let prompt = catalog
        .prompt(slug)
        .await?
        .ok_or_else(|| Error::BadRequest(format!("no prompt with slug {slug}")))?;

    let plan = match plan_id {
        Some(id) => {
            let id = PlanId::new(id);
            let plan = catalog
                .subscription_plans()
                .await?
                .into_iter()
                .find(|plan| plan.id == id)
                .ok_or_else(|| Error::BadRequest(format!("no subscription plan {id}")))?;
            Some(plan)
        }
        None => None,
    };

    let item = CartItem::new(prompt, plan);
    let title = item.prompt.title.clone();
    let id = ledger.add_to_cart(item)?;
    telemetry::breadcrumb("cart", format!("Added {slug}"));
    info!(id = %id, items = ledger.cart_count(), "Added {title} to cart");
    Ok(())
}

pub fn remove(ledger: &mut Ledger<JsonFileStore>, id: &str) -> promptos_storefront::Result<()> {
    if ledger.remove_from_cart(&CartItemId::new(id))? {
        info!(id, "Removed from cart");
    } else {
        info!(id, "No such cart line");
    }
    Ok(())
}

pub fn clear(ledger: &mut Ledger<JsonFileStore>) -> promptos_storefront::Result<()> {
    ledger.clear_cart()?;
    info!("Cart cleared");
    Ok(())
}

pub fn checkout(
    ledger: &mut Ledger<JsonFileStore>,
    method: PaymentMethod,
) -> promptos_storefront::Result<()> {
    let receipt = ledger.complete_purchase(method)?;
    let currency = ledger.wallet().currency();

    telemetry::breadcrumb("checkout", format!("Paid {} by {method}", receipt.total));
    for product in &receipt.purchases {
        info!(
            id = %product.id,
            key = %product.access_key,
            url = %product.access_url,
            expires = ?product.expiry_date,
            "Purchased {}",
            product.prompt_title
        );
    }
    info!(
        total = %Price::new(receipt.total, currency),
        balance = %ledger.wallet().balance_price(),
        "Checkout complete"
    );
    Ok(())
}
