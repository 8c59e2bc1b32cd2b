//! Command implementations.
//!
//! Commands share two handles built from [`StorefrontConfig`]: a catalog over
//! either the Cosmic API or a local fixture export, and a ledger persisted as
//! JSON files in the data directory.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod wallet;

use promptos_storefront::catalog::{
    Catalog, ContentError, ContentStore, CosmicStore, FixtureStore, Query,
};
use promptos_storefront::config::StorefrontConfig;
use promptos_storefront::ledger::Ledger;
use promptos_storefront::storage::JsonFileStore;
use serde_json::Value;

/// Where catalog reads go.
#[derive(Debug, Clone)]
pub enum Source {
    Cosmic(CosmicStore),
    Fixture(FixtureStore),
}

impl ContentStore for Source {
    async fn find(&self, query: &Query) -> Result<Vec<Value>, ContentError> {
        match self {
            Self::Cosmic(store) => store.find(query).await,
            Self::Fixture(store) => store.find(query).await,
        }
    }

    async fn find_one(&self, query: &Query) -> Result<Value, ContentError> {
        match self {
            Self::Cosmic(store) => store.find_one(query).await,
            Self::Fixture(store) => store.find_one(query).await,
        }
    }
}

/// Build the catalog. A fixture path takes precedence over Cosmic settings.
pub fn open_catalog(config: &StorefrontConfig) -> promptos_storefront::Result<Catalog<Source>> {
    let source = match &config.catalog.fixture_path {
        Some(path) => Source::Fixture(FixtureStore::from_path(path)?),
        None => Source::Cosmic(CosmicStore::new(config.catalog.require_cosmic()?)?),
    };
    Ok(Catalog::new(source, config.catalog.cache_ttl))
}

/// Load the ledger from the data directory.
pub fn open_ledger(config: &StorefrontConfig) -> promptos_storefront::Result<Ledger<JsonFileStore>> {
    let store = JsonFileStore::new(&config.data_dir);
    Ok(Ledger::open(store, config.ledger.clone())?)
}
