//! Tracing and Sentry setup.

use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promptos_storefront::ledger::User;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = concat!("promptos_storefront=info,", env!("CARGO_CRATE_NAME"), "=info");

/// Initialize Sentry when a DSN is configured. Keep the guard alive until exit.
pub fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Errors logged by this binary become Sentry events; everything else at
/// debug and above is kept as a breadcrumb.
///
/// `main` logs each fault once at error level, so library errors and warnings
/// only add context to that event.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> EventFilter {
    event_kind(*metadata.level(), metadata.target())
}

fn event_kind(level: Level, target: &str) -> EventFilter {
    match level {
        Level::ERROR if is_own_target(target) => EventFilter::Event,
        Level::ERROR | Level::WARN | Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    }
}

fn is_own_target(target: &str) -> bool {
    target.split("::").next() == Some(env!("CARGO_CRATE_NAME"))
}

/// Install the global subscriber: env filter, compact fmt output, Sentry layer.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Associate subsequent Sentry events with the signed-in user.
pub fn set_sentry_user(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.clone()),
            ..Default::default()
        }));
    });
}

/// Stop associating Sentry events with a user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a breadcrumb for a ledger action.
pub fn breadcrumb(category: &str, message: impl Into<String>) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.into()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWN: &str = env!("CARGO_CRATE_NAME");

    #[test]
    fn test_only_own_errors_are_events() {
        assert!(matches!(event_kind(Level::ERROR, OWN), EventFilter::Event));
        assert!(matches!(
            event_kind(Level::ERROR, &format!("{OWN}::commands::cart")),
            EventFilter::Event
        ));
        assert!(matches!(
            event_kind(Level::ERROR, "promptos_storefront::catalog::cosmic"),
            EventFilter::Breadcrumb
        ));
    }

    #[test]
    fn test_warnings_are_breadcrumbs() {
        // Rejections are logged at warn by `main` and must not reach Sentry as events.
        assert!(matches!(event_kind(Level::WARN, OWN), EventFilter::Breadcrumb));
        assert!(matches!(
            event_kind(Level::WARN, "promptos_storefront::ledger"),
            EventFilter::Breadcrumb
        ));
        assert!(matches!(event_kind(Level::INFO, OWN), EventFilter::Breadcrumb));
        assert!(matches!(event_kind(Level::TRACE, OWN), EventFilter::Ignore));
    }

    #[test]
    fn test_default_filter_covers_binary() {
        assert!(DEFAULT_FILTER.contains(&format!("{OWN}=info")));
    }
}
