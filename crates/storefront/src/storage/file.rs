//! JSON file store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::ledger::LedgerState;

use super::{PersistedState, StateStore, StoreError, records};

/// Stores each record as `{dir}/{record}.json`.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, record: &str) -> PathBuf {
        self.dir.join(format!("{record}.json"))
    }

    fn read<T: DeserializeOwned>(&self, record: &str) -> Result<Option<T>, StoreError> {
        let path = self.path(record);
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { path, source })
    }

    fn write<T: Serialize>(&self, record: &'static str, value: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(value)
            .map_err(|source| StoreError::Encode { record, source })?;

        let path = self.path(record);
        let tmp = self.dir.join(format!("{record}.json.tmp"));
        fs::write(&tmp, body).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }

    fn remove(&self, record: &str) -> Result<(), StoreError> {
        let path = self.path(record);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(PersistedState {
            current_user: self.read(records::CURRENT_USER)?,
            cart: self.read(records::CART_ITEMS)?,
            purchases: self.read(records::PURCHASED_PRODUCTS)?,
            wallet: self.read(records::WALLET)?,
        })
    }

    fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        match &state.current_user {
            Some(user) => self.write(records::CURRENT_USER, user)?,
            None => self.remove(records::CURRENT_USER)?,
        }
        self.write(records::CART_ITEMS, &state.cart)?;
        self.write(records::PURCHASED_PRODUCTS, &state.purchases)?;
        self.write(records::WALLET, &state.wallet)?;

        debug!(dir = %self.dir.display(), "Saved ledger state");
        Ok(())
    }
}
