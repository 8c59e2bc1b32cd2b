//! Integration tests for the PromptOS storefront.
//!
//! Tests drive the ledger through [`JsonFileStore`] in a temporary directory
//! and the catalog through the fixture export in `fixtures/catalog.json`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p promptos-integration-tests
//! ```
//!
//! [`JsonFileStore`]: promptos_storefront::storage::JsonFileStore

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use promptos_storefront::catalog::{Catalog, ContentError, FixtureStore};
use promptos_storefront::ledger::{Ledger, LedgerError, LedgerSettings};
use promptos_storefront::storage::JsonFileStore;

/// Path of the bundled catalog export.
#[must_use]
pub fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/catalog.json")
}

/// Catalog served from the bundled export.
///
/// # Errors
///
/// Returns an error if the fixture cannot be loaded.
pub fn fixture_catalog() -> Result<Catalog<FixtureStore>, ContentError> {
    let store = FixtureStore::from_path(&fixture_path())?;
    Ok(Catalog::new(store, Duration::from_secs(60)))
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Open a ledger over `dir` with default settings and the given clock.
///
/// Opening twice over the same directory simulates a restart.
///
/// # Errors
///
/// Returns an error if stored records cannot be read.
pub fn open_ledger(
    dir: &Path,
    clock: &Arc<TestClock>,
) -> Result<Ledger<JsonFileStore>, LedgerError> {
    Ledger::with_clock(
        JsonFileStore::new(dir),
        LedgerSettings::default(),
        Arc::clone(clock) as Arc<dyn Clock>,
    )
}
