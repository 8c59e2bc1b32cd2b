//! In-process state store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::ledger::LedgerState;

use super::{PersistedState, StateStore, StoreError};

/// Keeps records in memory. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    records: Mutex<PersistedState>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing records.
    #[must_use]
    pub fn with_records(records: PersistedState) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.inner.records.lock() {
            *guard = records;
        }
        store
    }

    /// Make every subsequent `save` fail until switched back.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    /// Copy of the stored records.
    #[must_use]
    pub fn records(&self) -> PersistedState {
        self.inner
            .records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<PersistedState, StoreError> {
        self.inner
            .records
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_owned()))
    }

    fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_owned()));
        }
        let mut guard = self
            .inner
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_owned()))?;
        *guard = PersistedState::from(state);
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
