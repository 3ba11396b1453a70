//! Ledger and state boundaries for the Plinth validator core.
//!
//! This crate provides:
//! - [`Ledger`] / [`State`] trait boundaries over the consumed storage
//!   primitives (append/commit/discard and key-value commit)
//! - [`InMemoryLedger`] / [`InMemoryState`] implementations for tests
//!   and embedding
//! - [`DatabaseManager`], the registry of every ledger the node tracks
//! - [`LedgerUncommittedTracker`], per-ledger bookkeeping of the
//!   applied-but-not-committed boundary

pub mod error;
pub mod manager;
pub mod memory;
pub mod tracker;
pub mod traits;

pub use error::LedgerError;
pub use manager::DatabaseManager;
pub use memory::{InMemoryLedger, InMemoryState};
pub use tracker::{LedgerUncommittedTracker, TrackerError};
pub use traits::{Ledger, State};
