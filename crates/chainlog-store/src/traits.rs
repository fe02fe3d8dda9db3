use crate::error::StoreResult;

/// Durable key-value store with sequential integer keys.
///
/// All implementations must satisfy these invariants:
/// - A key holds at most one value, and that value never changes once
///   written; `put` to an occupied key fails with `DuplicateKey`.
/// - `get` on a missing key is `Ok(None)`, not an error. I/O failures and
///   corruption are errors.
/// - `scan` returns every stored entry ordered by key.
/// - Concurrent reads are always safe.
pub trait RecordStore: Send + Sync {
    /// Write a value under the given key.
    fn put(&self, key: u64, value: &[u8]) -> StoreResult<()>;

    /// Read the value stored under the given key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether a key exists in the store.
    fn contains(&self, key: u64) -> StoreResult<bool>;

    /// Number of entries currently stored.
    fn len(&self) -> StoreResult<u64>;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Read every entry, ordered by key.
    fn scan(&self) -> StoreResult<Vec<(u64, Vec<u8>)>>;
}
