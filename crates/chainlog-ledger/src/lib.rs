//! Hash-linked, append-only record ledger.
//!
//! This crate is the heart of chainlog. It provides:
//! - The [`Record`] entity with canonical SHA-256 content hashing
//! - [`RecordDraft`], the builder that finalizes a record during append
//! - [`Ledger`], which owns the in-memory height index and drives the
//!   append / lookup / validate protocol against a [`RecordStore`]
//! - [`ValidationReport`], the result of a full chain integrity scan
//!
//! The ledger is single-writer: `append` is the only mutation and is
//! serialized internally; validation operations are pure reads.
//!
//! [`RecordStore`]: chainlog_store::RecordStore

pub mod error;
pub mod ledger;
pub mod record;
pub mod validation;

pub use error::LedgerError;
pub use ledger::{Ledger, GENESIS_PAYLOAD};
pub use record::{Record, RecordDraft};
pub use validation::ValidationReport;
