use std::collections::BTreeSet;

/// Result of a full chain integrity scan.
///
/// Validation failures are data findings, not errors: a scan always runs to
/// completion and reports the deduplicated set of heights whose records
/// failed the content-hash check or whose successor back-link does not
/// match. An empty set means the ledger is fully consistent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    /// Number of records the scan covered.
    pub record_count: u64,
    /// Heights flagged by either the hash check or the linkage check.
    pub invalid_heights: BTreeSet<u64>,
}

impl ValidationReport {
    /// An empty report over `record_count` records.
    pub fn new(record_count: u64) -> Self {
        Self {
            record_count,
            invalid_heights: BTreeSet::new(),
        }
    }

    /// Flag a height as invalid. Flagging twice is a no-op.
    pub fn mark_invalid(&mut self, height: u64) {
        self.invalid_heights.insert(height);
    }

    /// Returns `true` if no invalid heights were found.
    pub fn is_valid(&self) -> bool {
        self.invalid_heights.is_empty()
    }
}
