use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use chainlog_types::RecordHash;

use crate::error::LedgerError;

/// Domain tag prepended to every record hash computation.
const HASH_DOMAIN: &[u8] = b"chainlog-record-v1:";

/// One immutable, hash-committed entry in the ledger.
///
/// A `Record` commits to its content through `hash`: the SHA-256 digest of
/// the record's canonical serialization with the hash field zeroed. It
/// commits to its predecessor through `prev_hash`, which must equal the
/// hash of the record at `height - 1` (`None` for the genesis record).
///
/// Records are only constructed through [`RecordDraft::finalize`], so every
/// `Record` value observable outside the append routine carries a complete,
/// consistent set of fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Zero-based sequential position in the ledger.
    pub height: u64,
    /// Opaque caller-supplied content.
    pub payload: Vec<u8>,
    /// Seconds since the UNIX epoch, assigned by the ledger at append time.
    pub timestamp: u64,
    /// Hash of the predecessor record; `None` for genesis.
    pub prev_hash: Option<RecordHash>,
    /// Content hash over all other fields.
    pub hash: RecordHash,
}

impl Record {
    /// Recompute this record's content hash from its other fields.
    ///
    /// Canonicalization: the record is serialized to JSON in declaration
    /// field order with `hash` replaced by the zero hash, the domain tag is
    /// prepended, and SHA-256 is applied. Deterministic for equal field
    /// values on every platform.
    pub fn compute_hash(&self) -> Result<RecordHash, LedgerError> {
        let mut canonical = self.clone();
        canonical.hash = RecordHash::zero();

        let encoded = serde_json::to_vec(&canonical)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(HASH_DOMAIN);
        hasher.update(&encoded);
        Ok(RecordHash::from_digest(hasher.finalize().into()))
    }

    /// Returns `true` iff the stored hash matches the recomputed content
    /// hash. A mismatch means the record was altered after finalization.
    pub fn verify(&self) -> bool {
        match self.compute_hash() {
            Ok(computed) => computed == self.hash,
            Err(_) => false,
        }
    }

    /// Encode this record for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Decode a persisted record.
    pub fn from_bytes(height: u64, bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::CorruptRecord {
            height,
            reason: e.to_string(),
        })
    }
}

/// Builder for the not-yet-appended record.
///
/// A draft carries only the caller-supplied payload. Height, timestamp, and
/// predecessor hash are unknown until the ledger assigns them under its
/// write lock; [`finalize`](Self::finalize) completes the record and seals
/// it with its content hash in one step.
#[derive(Clone, Debug)]
pub struct RecordDraft {
    payload: Vec<u8>,
}

impl RecordDraft {
    /// Create a draft from a payload.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The draft's payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Complete the draft into an immutable, hash-sealed [`Record`].
    pub fn finalize(
        self,
        height: u64,
        timestamp: u64,
        prev_hash: Option<RecordHash>,
    ) -> Result<Record, LedgerError> {
        let mut record = Record {
            height,
            payload: self.payload,
            timestamp,
            prev_hash,
            hash: RecordHash::zero(),
        };
        record.hash = record.compute_hash()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalized(payload: &[u8], height: u64, prev: Option<RecordHash>) -> Record {
        RecordDraft::new(payload).finalize(height, 1_700_000_000, prev).unwrap()
    }

    #[test]
    fn finalize_seals_the_hash() {
        let record = finalized(b"A", 0, None);
        assert!(!record.hash.is_zero());
        assert_eq!(record.compute_hash().unwrap(), record.hash);
        assert!(record.verify());
    }

    #[test]
    fn hash_is_deterministic() {
        let a = finalized(b"same", 3, Some(RecordHash::from_bytes(b"prev")));
        let b = finalized(b"same", 3, Some(RecordHash::from_bytes(b"prev")));
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn hash_covers_every_field() {
        let base = finalized(b"payload", 1, Some(RecordHash::from_bytes(b"p")));

        let mut changed = base.clone();
        changed.payload = b"tampered".to_vec();
        assert_ne!(changed.compute_hash().unwrap(), base.hash);

        let mut changed = base.clone();
        changed.height = 2;
        assert_ne!(changed.compute_hash().unwrap(), base.hash);

        let mut changed = base.clone();
        changed.timestamp += 1;
        assert_ne!(changed.compute_hash().unwrap(), base.hash);

        let mut changed = base.clone();
        changed.prev_hash = None;
        assert_ne!(changed.compute_hash().unwrap(), base.hash);
    }

    #[test]
    fn tampered_record_fails_verify() {
        let mut record = finalized(b"original", 0, None);
        record.payload = b"altered".to_vec();
        assert!(!record.verify());
    }

    #[test]
    fn stored_encoding_roundtrip() {
        let record = finalized(b"persist me", 5, Some(RecordHash::from_bytes(b"prev")));
        let bytes = record.to_bytes().unwrap();
        let decoded = Record::from_bytes(5, &bytes).unwrap();
        assert_eq!(decoded, record);
        assert!(decoded.verify());
    }

    #[test]
    fn garbage_bytes_are_a_corrupt_record() {
        let err = Record::from_bytes(7, b"\xFF\xFF").unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRecord { height: 7, .. }));
    }
}
