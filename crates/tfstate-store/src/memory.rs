use std::collections::BTreeMap;
use std::sync::RwLock;

use tfstate_types::{StateId, StateRecord};

use crate::error::{StoreError, StoreResult};
use crate::traits::{StateStore, UpdateFn};

/// In-memory state store.
///
/// Intended for tests and embedding. Records live in a `BTreeMap` behind a
/// `RwLock`; `update` holds the write lock across read and write, which is
/// what makes it atomic.
pub struct InMemoryStateStore {
    records: RwLock<BTreeMap<StateId, StateRecord>>,
}

impl InMemoryStateStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStateStore {
    fn lookup(&self, id: &StateId) -> StoreResult<StateRecord> {
        let map = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned("in-memory store"))?;
        Ok(map.get(id).cloned().unwrap_or_default())
    }

    fn upsert(&self, id: &StateId, record: &StateRecord) -> StoreResult<()> {
        let mut map = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("in-memory store"))?;
        map.insert(id.clone(), record.clone());
        Ok(())
    }

    fn scan(&self) -> StoreResult<Vec<StateRecord>> {
        let map = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned("in-memory store"))?;
        Ok(map.values().cloned().collect())
    }

    fn update(&self, id: &StateId, apply: &mut UpdateFn<'_>) -> StoreResult<StateRecord> {
        let mut map = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("in-memory store"))?;
        let current = map.get(id).cloned().unwrap_or_default();
        if let Some(next) = apply(&current) {
            map.insert(id.clone(), next);
        }
        Ok(current)
    }
}

impl std::fmt::Debug for InMemoryStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStateStore")
            .field("record_count", &self.len())
            .finish()
    }
}
