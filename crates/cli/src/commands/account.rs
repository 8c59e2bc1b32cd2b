//! Session commands.

use tracing::info;

use promptos_storefront::ledger::Ledger;
use promptos_storefront::storage::JsonFileStore;

use crate::telemetry;

pub fn login(
    ledger: &mut Ledger<JsonFileStore>,
    email: &str,
    password: &str,
) -> promptos_storefront::Result<()> {
    let user = ledger.login(email, password)?;
    telemetry::set_sentry_user(&user);
    info!(user_id = %user.id, "Signed in as {}", user.name);
    Ok(())
}

pub fn register(
    ledger: &mut Ledger<JsonFileStore>,
    email: &str,
    password: &str,
    name: &str,
) -> promptos_storefront::Result<()> {
    let user = ledger.register(email, password, name)?;
    telemetry::set_sentry_user(&user);
    info!(user_id = %user.id, "Registered and signed in as {}", user.name);
    Ok(())
}

pub fn logout(ledger: &mut Ledger<JsonFileStore>) -> promptos_storefront::Result<()> {
    ledger.logout()?;
    telemetry::clear_sentry_user();
    info!("Signed out");
    Ok(())
}

pub fn whoami(ledger: &Ledger<JsonFileStore>) {
    match ledger.current_user() {
        Some(user) => info!(
            user_id = %user.id,
            email = %user.email,
            since = %user.created_at,
            "{}",
            user.name
        ),
        None => info!("Not signed in"),
    }
}
