use plinth_types::{LedgerId, LedgerTxn, ThreePcBatch};

use crate::error::BatchError;

/// Data threaded from one handler to the next within a single batch,
/// so a handler can pass derived data onward without a shared mutable
/// global.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerResult {
    /// Transactions produced or committed by the previous handler.
    Txns(Vec<LedgerTxn>),
}

/// Lifecycle every per-ledger batch handler implements.
///
/// The ordering/commit driver invokes these with the batch being
/// processed and the previous handler's result. Handlers for different
/// ledgers run in a fixed, deterministic order per batch, so side
/// effects such as audit-entry construction can observe already-applied
/// sibling ledgers within the same batch.
pub trait BatchRequestHandler: Send + Sync {
    /// The ledger this handler is responsible for.
    fn ledger_id(&self) -> LedgerId;

    /// A batch was applied: mutate uncommitted state accordingly.
    fn post_batch_applied(
        &self,
        batch: &ThreePcBatch,
        prev_result: Option<&HandlerResult>,
    ) -> Result<Option<HandlerResult>, BatchError>;

    /// A batch was abandoned (view change): roll uncommitted state back.
    /// Rollbacks arrive in exact reverse order of application.
    fn post_batch_rejected(
        &self,
        ledger_id: LedgerId,
        prev_result: Option<&HandlerResult>,
    ) -> Result<Option<HandlerResult>, BatchError>;

    /// Quorum reached: durably commit the batch's pending transactions
    /// and return them.
    fn commit_batch(
        &self,
        batch: &ThreePcBatch,
        prev_result: Option<&HandlerResult>,
    ) -> Result<Vec<LedgerTxn>, BatchError>;
}
