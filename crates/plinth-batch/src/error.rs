use plinth_ledger::{LedgerError, TrackerError};
use plinth_types::{LedgerId, TypeError};
use thiserror::Error;

/// Errors produced while driving a batch through its lifecycle.
///
/// Everything here is in the fatal class of the error taxonomy: a bug
/// in the driver or a corrupted audit ledger. None of these are
/// retried; the offending batch halts and the error propagates to
/// node-level fault handling (typically a catch-up or restart). Each
/// audit variant carries the `(view_no, pp_seq_no)` of the batch being
/// processed for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("no batch handler registered for ledger {0}")]
    NoHandler(LedgerId),

    #[error("handler for ledger {0} is already registered")]
    HandlerAlreadyRegistered(LedgerId),

    #[error(
        "audit entry at seq {seq_no} is malformed while processing \
         (view {view_no}, seq {pp_seq_no}): {reason}"
    )]
    CorruptAuditEntry {
        view_no: u64,
        pp_seq_no: u64,
        seq_no: u64,
        reason: String,
    },

    #[error(
        "primaries delta {delta} at audit seq {seq_no} points past the \
         audit ledger (uncommitted size {uncommitted_size}) while processing \
         (view {view_no}, seq {pp_seq_no})"
    )]
    DeltaOutOfRange {
        view_no: u64,
        pp_seq_no: u64,
        seq_no: u64,
        delta: u64,
        uncommitted_size: u64,
    },

    #[error(
        "audit entry at seq {seq_no} holds no primaries where a value is \
         required, while processing (view {view_no}, seq {pp_seq_no})"
    )]
    MissingPrimaries {
        view_no: u64,
        pp_seq_no: u64,
        seq_no: u64,
    },

    #[error(
        "primaries back-reference resolved to audit seq {seq_no}, which does \
         not hold a literal primary list, while processing \
         (view {view_no}, seq {pp_seq_no})"
    )]
    CorruptPrimaries {
        view_no: u64,
        pp_seq_no: u64,
        seq_no: u64,
    },
}
