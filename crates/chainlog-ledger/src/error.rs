/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The persistence call failed; the append aborted with no state mutated.
    #[error("store failure: {0}")]
    StoreFailure(String),

    /// The requested height is absent from the store.
    #[error("no record at height {height}")]
    NotFound { height: u64 },

    /// The in-memory index disagrees with store content. Fatal for this
    /// ledger instance: further appends are refused.
    #[error("ledger inconsistent: {reason}")]
    Inconsistent { reason: String },

    /// A persisted record could not be decoded.
    #[error("corrupt record at height {height}: {reason}")]
    CorruptRecord { height: u64, reason: String },

    /// Serialization failure while encoding or hashing a record.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<chainlog_store::StoreError> for LedgerError {
    fn from(err: chainlog_store::StoreError) -> Self {
        Self::StoreFailure(err.to_string())
    }
}
