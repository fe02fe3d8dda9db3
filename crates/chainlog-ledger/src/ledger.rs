use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use chainlog_store::RecordStore;
use chainlog_types::RecordHash;

use crate::error::LedgerError;
use crate::record::{Record, RecordDraft};
use crate::validation::ValidationReport;

/// Payload of the auto-created height-0 record.
pub const GENESIS_PAYLOAD: &[u8] = b"First record in the chain - Genesis record";

/// In-memory chain index: one hash per height, in height order.
///
/// `poisoned` is set when the index is found to disagree with the store;
/// from then on the ledger refuses appends rather than risk corrupting
/// heights.
struct ChainIndex {
    hashes: Vec<RecordHash>,
    poisoned: bool,
}

/// The append-only, hash-linked ledger.
///
/// A `Ledger` owns the in-memory height index and is the only writer to its
/// record store. Opening is explicit: [`Ledger::open`] rebuilds the index
/// from persisted records and creates the genesis record against an empty
/// store, so no I/O hides inside construction.
///
/// Single-writer, any-number-of-readers: `append` serializes internally on
/// a write lock held for the whole assign-height / hash / persist / publish
/// sequence, and readers only ever observe the index after a successful
/// persist.
pub struct Ledger {
    store: Arc<dyn RecordStore>,
    index: RwLock<ChainIndex>,
}

impl Ledger {
    /// Open a ledger against a record store.
    ///
    /// Scans the store in key order to rebuild the height index. An empty
    /// store gets a genesis record appended before `open` returns, so an
    /// opened ledger always has at least height 0. A store whose keys are
    /// not the gapless sequence `0..n` fails with
    /// [`LedgerError::Inconsistent`]; an undecodable record fails with
    /// [`LedgerError::CorruptRecord`].
    pub fn open(store: Arc<dyn RecordStore>) -> Result<Self, LedgerError> {
        let entries = store.scan()?;
        let mut hashes = Vec::with_capacity(entries.len());

        for (expected, (key, bytes)) in entries.iter().enumerate() {
            if *key != expected as u64 {
                return Err(LedgerError::Inconsistent {
                    reason: format!("expected height {expected}, store holds key {key}"),
                });
            }
            let record = Record::from_bytes(*key, bytes)?;
            if record.height != *key {
                return Err(LedgerError::Inconsistent {
                    reason: format!(
                        "record under key {key} claims height {}",
                        record.height
                    ),
                });
            }
            hashes.push(record.hash);
        }

        let ledger = Self {
            store,
            index: RwLock::new(ChainIndex {
                hashes,
                poisoned: false,
            }),
        };

        let is_empty = ledger.read_index()?.is_empty();
        if is_empty {
            debug!("empty store; creating genesis record");
            ledger.append(GENESIS_PAYLOAD)?;
        }

        let height = ledger.height().unwrap_or_default();
        debug!(height, "ledger opened");
        Ok(ledger)
    }

    /// Height of the last record, or `None` if no record exists yet.
    ///
    /// After a successful [`open`](Self::open) this is always `Some`, since
    /// genesis creation is part of opening.
    pub fn height(&self) -> Option<u64> {
        let index = self.index.read().ok()?;
        index.hashes.len().checked_sub(1).map(|h| h as u64)
    }

    /// Append a payload as the next record.
    ///
    /// Stamps height, wall-clock timestamp, and predecessor hash, seals the
    /// record with its content hash, persists it, and only then publishes it
    /// to the in-memory index. On any failure the ledger is left in the
    /// exact pre-call state: no partial record, no skipped height.
    pub fn append(&self, payload: &[u8]) -> Result<u64, LedgerError> {
        let mut index = self
            .index
            .write()
            .map_err(|_| LedgerError::Inconsistent {
                reason: "ledger write lock poisoned".into(),
            })?;

        if index.poisoned {
            return Err(LedgerError::Inconsistent {
                reason: "ledger refused append after earlier consistency violation".into(),
            });
        }

        let height = index.hashes.len() as u64;

        // The index is authoritative for heights, but it must agree with the
        // store before we hand out a new one. Divergence means an unserialized
        // writer got in; this instance stops appending.
        let store_len = self.store.len()?;
        if store_len != height {
            index.poisoned = true;
            warn!(index_len = height, store_len, "index diverged from store");
            return Err(LedgerError::Inconsistent {
                reason: format!(
                    "index holds {height} records but store holds {store_len}"
                ),
            });
        }

        let prev_hash = index.hashes.last().copied();
        let record = RecordDraft::new(payload).finalize(height, now_secs(), prev_hash)?;
        let bytes = record.to_bytes()?;

        self.store.put(height, &bytes)?;
        index.hashes.push(record.hash);

        debug!(height, hash = %record.hash.short_hex(), "record appended");
        Ok(height)
    }

    /// Load the record at the given height from the store.
    pub fn get_record(&self, height: u64) -> Result<Record, LedgerError> {
        match self.store.get(height)? {
            Some(bytes) => Record::from_bytes(height, &bytes),
            None => Err(LedgerError::NotFound { height }),
        }
    }

    /// Check the record at `height` for internal consistency.
    ///
    /// Returns `true` iff the record loads and its stored hash matches the
    /// recomputed content hash. Never fails: a missing or corrupt record is
    /// simply not valid.
    pub fn validate_record(&self, height: u64) -> bool {
        match self.get_record(height) {
            Ok(record) => record.verify(),
            Err(_) => false,
        }
    }

    /// Validate the whole chain: content hashes plus predecessor linkage.
    ///
    /// For every height `h` except the last, the record is checked for
    /// internal consistency and its hash is compared against the successor's
    /// back-link; `h` lands in the report's invalid set if either check
    /// fails. Missing or corrupt records are reported as invalid, never
    /// propagated as errors, so the scan always completes.
    pub fn validate_chain(&self) -> ValidationReport {
        let count = self
            .index
            .read()
            .map(|index| index.hashes.len() as u64)
            .unwrap_or(0);

        let mut report = ValidationReport::new(count);
        if count < 2 {
            return report;
        }

        let mut current = self.get_record(0);
        for height in 0..count - 1 {
            let successor = self.get_record(height + 1);

            match &current {
                Ok(record) if record.verify() => {}
                _ => report.mark_invalid(height),
            }

            match (&current, &successor) {
                (Ok(record), Ok(next)) if next.prev_hash == Some(record.hash) => {}
                _ => report.mark_invalid(height),
            }

            current = successor;
        }

        if !report.is_valid() {
            warn!(
                invalid = report.invalid_heights.len(),
                "chain validation found invalid records"
            );
        }
        report
    }

    fn read_index(&self) -> Result<std::sync::RwLockReadGuard<'_, ChainIndex>, LedgerError> {
        self.index.read().map_err(|_| LedgerError::Inconsistent {
            reason: "ledger read lock poisoned".into(),
        })
    }
}

impl ChainIndex {
    fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("height", &self.height())
            .finish()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use chainlog_store::{InMemoryRecordStore, StoreError, StoreResult};

    use super::*;

    /// Store wrapper whose `put` can be switched to fail, for exercising the
    /// no-partial-state guarantee.
    struct FailingStore {
        inner: InMemoryRecordStore,
        fail_puts: AtomicBool,
    }

    impl FailingStore {
        fn new() -> Self {
            Self {
                inner: InMemoryRecordStore::new(),
                fail_puts: AtomicBool::new(false),
            }
        }

        fn fail_next_puts(&self, fail: bool) {
            self.fail_puts.store(fail, Ordering::SeqCst);
        }
    }

    impl RecordStore for FailingStore {
        fn put(&self, key: u64, value: &[u8]) -> StoreResult<()> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("injected put failure")));
            }
            self.inner.put(key, value)
        }

        fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn contains(&self, key: u64) -> StoreResult<bool> {
            self.inner.contains(key)
        }

        fn len(&self) -> StoreResult<u64> {
            self.inner.len()
        }

        fn scan(&self) -> StoreResult<Vec<(u64, Vec<u8>)>> {
            self.inner.scan()
        }
    }

    fn open_ledger() -> Ledger {
        Ledger::open(Arc::new(InMemoryRecordStore::new())).unwrap()
    }

    #[test]
    fn open_creates_genesis_on_empty_store() {
        let ledger = open_ledger();
        assert_eq!(ledger.height(), Some(0));

        let genesis = ledger.get_record(0).unwrap();
        assert_eq!(genesis.height, 0);
        assert_eq!(genesis.payload, GENESIS_PAYLOAD);
        assert_eq!(genesis.prev_hash, None);
        assert!(genesis.verify());
    }

    #[test]
    fn append_assigns_gapless_heights() {
        let ledger = open_ledger();
        for i in 1..=5u64 {
            let height = ledger.append(format!("payload-{i}").as_bytes()).unwrap();
            assert_eq!(height, i);
        }
        assert_eq!(ledger.height(), Some(5));
    }

    #[test]
    fn append_links_to_predecessor() {
        let ledger = open_ledger();
        let h1 = ledger.append(b"A").unwrap();
        let h2 = ledger.append(b"B").unwrap();

        let genesis = ledger.get_record(0).unwrap();
        let a = ledger.get_record(h1).unwrap();
        let b = ledger.get_record(h2).unwrap();

        assert_eq!(a.prev_hash, Some(genesis.hash));
        assert_eq!(b.prev_hash, Some(a.hash));
    }

    #[test]
    fn appended_record_round_trips_with_valid_hash() {
        let ledger = open_ledger();
        let height = ledger.append(b"round trip").unwrap();
        let record = ledger.get_record(height).unwrap();
        assert_eq!(record.payload, b"round trip");
        assert_eq!(record.compute_hash().unwrap(), record.hash);
    }

    #[test]
    fn get_record_missing_height_is_not_found() {
        let ledger = open_ledger();
        let err = ledger.get_record(99).unwrap_err();
        assert_eq!(err, LedgerError::NotFound { height: 99 });
    }

    #[test]
    fn failed_put_leaves_ledger_unchanged() {
        let store = Arc::new(FailingStore::new());
        let ledger = Ledger::open(store.clone()).unwrap();
        ledger.append(b"B").unwrap();
        assert_eq!(ledger.height(), Some(1));

        store.fail_next_puts(true);
        let err = ledger.append(b"C").unwrap_err();
        assert!(matches!(err, LedgerError::StoreFailure(_)));

        // Pre-call state: height unchanged, failed payload absent.
        assert_eq!(ledger.height(), Some(1));
        assert_eq!(
            ledger.get_record(2).unwrap_err(),
            LedgerError::NotFound { height: 2 }
        );

        // The whole operation is retryable.
        store.fail_next_puts(false);
        assert_eq!(ledger.append(b"C").unwrap(), 2);
        assert_eq!(ledger.get_record(2).unwrap().payload, b"C");
    }

    #[test]
    fn diverged_store_poisons_the_ledger() {
        let store = Arc::new(InMemoryRecordStore::new());
        let ledger = Ledger::open(store.clone()).unwrap();

        // An unserialized writer sneaks a record past the index.
        store.put(1, b"interloper").unwrap();

        let err = ledger.append(b"next").unwrap_err();
        assert!(matches!(err, LedgerError::Inconsistent { .. }));

        // Fatal for this instance: later appends are refused too.
        let err = ledger.append(b"again").unwrap_err();
        assert!(matches!(err, LedgerError::Inconsistent { .. }));
    }

    #[test]
    fn reopen_rebuilds_index_from_store() {
        let store = Arc::new(InMemoryRecordStore::new());
        {
            let ledger = Ledger::open(store.clone()).unwrap();
            ledger.append(b"A").unwrap();
            ledger.append(b"B").unwrap();
        }

        let reopened = Ledger::open(store).unwrap();
        assert_eq!(reopened.height(), Some(2));
        assert_eq!(reopened.get_record(2).unwrap().payload, b"B");
        assert!(reopened.validate_chain().is_valid());

        // Appends continue the chain where it left off.
        assert_eq!(reopened.append(b"C").unwrap(), 3);
    }

    #[test]
    fn open_rejects_gapped_store() {
        let store = Arc::new(InMemoryRecordStore::new());
        let record = RecordDraft::new(b"stray".as_slice())
            .finalize(3, 0, None)
            .unwrap();
        store.put(3, &record.to_bytes().unwrap()).unwrap();

        let err = Ledger::open(store).unwrap_err();
        assert!(matches!(err, LedgerError::Inconsistent { .. }));
    }

    #[test]
    fn open_rejects_undecodable_record() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.put(0, b"not a record").unwrap();

        let err = Ledger::open(store).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRecord { height: 0, .. }));
    }

    #[test]
    fn open_on_file_store_persists_across_processes() {
        use chainlog_store::{FileRecordStore, SyncMode};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.seg");

        {
            let store = FileRecordStore::open(&path, SyncMode::EveryWrite).unwrap();
            let ledger = Ledger::open(Arc::new(store)).unwrap();
            ledger.append(b"durable").unwrap();
        }

        let store = FileRecordStore::open(&path, SyncMode::EveryWrite).unwrap();
        let ledger = Ledger::open(Arc::new(store)).unwrap();
        assert_eq!(ledger.height(), Some(1));
        assert_eq!(ledger.get_record(1).unwrap().payload, b"durable");
        assert!(ledger.validate_chain().is_valid());
    }

    #[test]
    fn validate_record_true_for_intact_false_for_missing() {
        let ledger = open_ledger();
        ledger.append(b"ok").unwrap();
        assert!(ledger.validate_record(0));
        assert!(ledger.validate_record(1));
        assert!(!ledger.validate_record(9));
    }
}
