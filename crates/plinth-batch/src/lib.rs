//! Batch lifecycle handlers for the Plinth validator core.
//!
//! When the ordering protocol decides a batch is ready, the
//! [`BatchExecutor`] drives every registered [`BatchRequestHandler`]
//! through the apply / commit / reject lifecycle in a fixed,
//! deterministic order. The [`AuditBatchHandler`] rides along on every
//! batch, appending one delta-encoded entry to the audit ledger, the
//! trail lagging nodes use to verify and resynchronize state.

pub mod audit;
pub mod error;
pub mod executor;
pub mod handler;
pub mod ledger_handler;

pub use audit::AuditBatchHandler;
pub use error::BatchError;
pub use executor::BatchExecutor;
pub use handler::{BatchRequestHandler, HandlerResult};
pub use ledger_handler::LedgerBatchHandler;
