//! Foundation types for the chainlog ledger.
//!
//! Every other chainlog crate depends on this one. It provides:
//!
//! - [`RecordHash`] — SHA-256 content hash of a ledger record
//! - [`TypeError`] — errors from parsing/encoding these types

pub mod error;
pub mod hash;

pub use error::TypeError;
pub use hash::RecordHash;
