use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use plinth_types::{LedgerId, LedgerTxn, ThreePcBatch};

use crate::error::BatchError;
use crate::handler::{BatchRequestHandler, HandlerResult};

/// Drives registered handlers through the batch lifecycle in a fixed,
/// deterministic order.
///
/// Per-ledger handlers are keyed by ledger id; observer handlers (the
/// audit handler) run after the target ledger's handler on every batch,
/// in registration order, so they see the batch's effects already
/// applied. Rejection runs in exact reverse order of application.
pub struct BatchExecutor {
    handlers: BTreeMap<LedgerId, Arc<dyn BatchRequestHandler>>,
    observers: Vec<Arc<dyn BatchRequestHandler>>,
}

impl BatchExecutor {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            observers: Vec::new(),
        }
    }

    /// Register the handler responsible for its ledger. One handler per
    /// ledger; duplicates are an error.
    pub fn register_batch_handler(
        &mut self,
        handler: Arc<dyn BatchRequestHandler>,
    ) -> Result<(), BatchError> {
        let ledger_id = handler.ledger_id();
        if self.handlers.contains_key(&ledger_id) {
            return Err(BatchError::HandlerAlreadyRegistered(ledger_id));
        }
        self.handlers.insert(ledger_id, handler);
        Ok(())
    }

    /// Register an observer handler invoked after the target ledger's
    /// handler on every batch. Registration order is invocation order.
    pub fn register_observer(&mut self, handler: Arc<dyn BatchRequestHandler>) {
        self.observers.push(handler);
    }

    fn chain_for(&self, ledger_id: LedgerId) -> Result<Vec<Arc<dyn BatchRequestHandler>>, BatchError> {
        let target = self
            .handlers
            .get(&ledger_id)
            .cloned()
            .ok_or(BatchError::NoHandler(ledger_id))?;
        let mut chain = vec![target];
        chain.extend(self.observers.iter().cloned());
        Ok(chain)
    }

    /// Apply a batch: target ledger's handler first, then observers,
    /// threading each handler's result into the next.
    pub fn apply_batch(&self, batch: &ThreePcBatch) -> Result<(), BatchError> {
        debug!(
            view_no = batch.view_no,
            pp_seq_no = batch.pp_seq_no,
            ledger_id = %batch.ledger_id,
            "applying batch"
        );
        let mut prev: Option<HandlerResult> = None;
        for handler in self.chain_for(batch.ledger_id)? {
            prev = handler.post_batch_applied(batch, prev.as_ref())?;
        }
        Ok(())
    }

    /// Commit a batch on quorum, returning the target ledger's committed
    /// transactions.
    pub fn commit_batch(&self, batch: &ThreePcBatch) -> Result<Vec<LedgerTxn>, BatchError> {
        debug!(
            view_no = batch.view_no,
            pp_seq_no = batch.pp_seq_no,
            ledger_id = %batch.ledger_id,
            "committing batch"
        );
        let chain = self.chain_for(batch.ledger_id)?;
        let mut committed: Vec<LedgerTxn> = Vec::new();
        let mut prev: Option<HandlerResult> = None;
        for (i, handler) in chain.iter().enumerate() {
            let txns = handler.commit_batch(batch, prev.as_ref())?;
            if i == 0 {
                committed = txns.clone();
            }
            prev = Some(HandlerResult::Txns(txns));
        }
        Ok(committed)
    }

    /// Reject (roll back) the most recently applied batch for
    /// `ledger_id`, running handlers in exact reverse order of
    /// application.
    pub fn reject_batch(&self, ledger_id: LedgerId) -> Result<(), BatchError> {
        debug!(ledger_id = %ledger_id, "rejecting batch");
        let mut chain = self.chain_for(ledger_id)?;
        chain.reverse();
        let mut prev: Option<HandlerResult> = None;
        for handler in chain {
            prev = handler.post_batch_rejected(ledger_id, prev.as_ref())?;
        }
        Ok(())
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}
