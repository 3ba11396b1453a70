use plinth_types::{LedgerId, RootHash};
use thiserror::Error;

/// Errors produced by ledger, state, and registry operations.
///
/// `UnregisteredLedger`, `AlreadyRegistered`, and `RootMismatch` are
/// fatal logic errors: they indicate a bug or corrupted data, are never
/// retried, and propagate to node-level fault handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger {0} is not registered")]
    UnregisteredLedger(LedgerId),

    #[error("ledger {0} is already registered")]
    AlreadyRegistered(LedgerId),

    #[error("commit of {requested} txns exceeds {pending} pending")]
    CommitOverflow { requested: u64, pending: u64 },

    #[error("discard of {requested} txns exceeds {pending} pending")]
    DiscardOverflow { requested: u64, pending: u64 },

    #[error("root mismatch for ledger {ledger_id}: expected {expected}, got {actual}")]
    RootMismatch {
        ledger_id: LedgerId,
        expected: RootHash,
        actual: RootHash,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    LockPoisoned(String),
}
