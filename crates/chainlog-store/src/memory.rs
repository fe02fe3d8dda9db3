use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;

/// In-memory, `BTreeMap`-based record store.
///
/// Intended for tests and embedding. All entries are held in memory behind a
/// `RwLock` for safe concurrent access. Values are cloned on read.
pub struct InMemoryRecordStore {
    entries: RwLock<BTreeMap<u64, Vec<u8>>>,
}

impl InMemoryRecordStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Remove all entries from the store.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn put(&self, key: u64, value: &[u8]) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        if map.contains_key(&key) {
            return Err(StoreError::DuplicateKey { key });
        }
        map.insert(key, value.to_vec());
        Ok(())
    }

    fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(&key).cloned())
    }

    fn contains(&self, key: u64) -> StoreResult<bool> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.contains_key(&key))
    }

    fn len(&self) -> StoreResult<u64> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.len() as u64)
    }

    fn scan(&self) -> StoreResult<Vec<(u64, Vec<u8>)>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.iter().map(|(k, v)| (*k, v.clone())).collect())
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryRecordStore")
            .field("entry_count", &count)
            .finish()
    }
}
