use std::sync::{Arc, RwLock};

use tracing::debug;

use plinth_ledger::{DatabaseManager, Ledger, LedgerError, LedgerUncommittedTracker, State, TrackerError};
use plinth_types::{LedgerId, LedgerTxn, ThreePcBatch};

use crate::error::BatchError;
use crate::handler::{BatchRequestHandler, HandlerResult};

/// Generic batch handler for a normal (non-audit) ledger.
///
/// Apply records the batch's growth in the tracker with the batch
/// state root as marker. Commit pops the tracker, commits that many
/// ledger entries, verifies the committed ledger root against the
/// batch's transaction root (a mismatch means this node diverged and
/// must catch up), then commits state. Reject discards the newest
/// pending batch and rolls the state overlay back.
pub struct LedgerBatchHandler {
    ledger_id: LedgerId,
    ledger: Arc<dyn Ledger>,
    state: Arc<dyn State>,
    tracker: RwLock<LedgerUncommittedTracker>,
}

impl LedgerBatchHandler {
    pub fn new(
        database_manager: &DatabaseManager,
        ledger_id: LedgerId,
    ) -> Result<Self, BatchError> {
        let db = database_manager.get_database(ledger_id)?;
        let tracker = LedgerUncommittedTracker::new(
            Some(db.state.committed_root_hash()?),
            db.ledger.size()?,
        );
        Ok(Self {
            ledger_id,
            ledger: db.ledger,
            state: db.state,
            tracker: RwLock::new(tracker),
        })
    }
}

impl BatchRequestHandler for LedgerBatchHandler {
    fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    fn post_batch_applied(
        &self,
        batch: &ThreePcBatch,
        _prev_result: Option<&HandlerResult>,
    ) -> Result<Option<HandlerResult>, BatchError> {
        let uncommitted = self.ledger.uncommitted_size()?;
        let (_, count) = self
            .tracker
            .write()
            .map_err(|_| LedgerError::LockPoisoned("tracker lock poisoned".into()))?
            .apply_batch(Some(batch.state_root), uncommitted)?;
        debug!(
            ledger_id = %self.ledger_id,
            pp_seq_no = batch.pp_seq_no,
            txns = count,
            "tracked applied batch"
        );
        Ok(None)
    }

    fn post_batch_rejected(
        &self,
        _ledger_id: LedgerId,
        _prev_result: Option<&HandlerResult>,
    ) -> Result<Option<HandlerResult>, BatchError> {
        let (count, revert_to) = {
            let mut tracker = self
                .tracker
                .write()
                .map_err(|_| LedgerError::LockPoisoned("tracker lock poisoned".into()))?;
            let (_, count) = tracker.reject_batch()?;
            (count, tracker.head_marker())
        };
        self.ledger.discard(count)?;
        if let Some(root) = revert_to {
            self.state.revert_to_head(root)?;
        }
        debug!(ledger_id = %self.ledger_id, txns = count, "rolled back rejected batch");
        Ok(None)
    }

    fn commit_batch(
        &self,
        batch: &ThreePcBatch,
        _prev_result: Option<&HandlerResult>,
    ) -> Result<Vec<LedgerTxn>, BatchError> {
        let count = {
            let mut tracker = self
                .tracker
                .write()
                .map_err(|_| LedgerError::LockPoisoned("tracker lock poisoned".into()))?;
            let count = tracker
                .front_batch_size()
                .ok_or(TrackerError::NothingPending)?;
            tracker.commit_batch(count)?;
            count
        };
        let txns = self.ledger.commit(count)?;

        let committed_root = self.ledger.root_hash()?;
        if committed_root != batch.txn_root {
            return Err(BatchError::Ledger(LedgerError::RootMismatch {
                ledger_id: self.ledger_id,
                expected: batch.txn_root,
                actual: committed_root,
            }));
        }
        self.state.commit(batch.state_root)?;
        debug!(
            ledger_id = %self.ledger_id,
            pp_seq_no = batch.pp_seq_no,
            txns = count,
            "committed batch"
        );
        Ok(txns)
    }
}
