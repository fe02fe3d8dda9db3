//! Key-value record storage for the chainlog ledger.
//!
//! The ledger treats persistence as an external collaborator: a durable map
//! from sequential integer heights to encoded record bytes. This crate
//! provides that collaborator behind the [`RecordStore`] trait.
//!
//! # Storage Backends
//!
//! - [`InMemoryRecordStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FileRecordStore`] -- append-only segment file with CRC-framed entries
//!   and crash recovery
//!
//! # Design Rules
//!
//! 1. Records are immutable once written; a second `put` to the same key is
//!    rejected rather than overwriting.
//! 2. Concurrent reads are always safe.
//! 3. The store never interprets record contents -- it is a pure key-value
//!    store.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileRecordStore, SyncMode};
pub use memory::InMemoryRecordStore;
pub use traits::RecordStore;
