use serde::{Deserialize, Serialize};

use crate::hash::RootHash;
use crate::ids::{LedgerId, NodeId};

/// Immutable description of one ordered consensus batch.
///
/// Built once by the ordering protocol when a batch of client requests
/// is assigned a slot, then handed to the batch handlers unchanged.
/// `(view_no, pp_seq_no)` uniquely identifies the batch within the
/// node's lifetime, and `pp_seq_no` strictly increases within a view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreePcBatch {
    /// View in which the batch was ordered.
    pub view_no: u64,
    /// Sequence number assigned by the primary, monotonic within a view.
    pub pp_seq_no: u64,
    /// The ledger this batch's requests are written to.
    pub ledger_id: LedgerId,
    /// Transaction merkle root of `ledger_id` after applying the batch.
    pub txn_root: RootHash,
    /// State trie root of `ledger_id` after applying the batch.
    pub state_root: RootHash,
    /// Ordering timestamp (epoch seconds) set by the primary.
    pub pp_time: u64,
    /// Ordered list of active primaries at the time of this batch.
    pub primaries: Vec<NodeId>,
    /// False for batches ordered before auditing existed; the audit
    /// handler skips such batches entirely.
    pub has_audit_txn: bool,
}

impl ThreePcBatch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        view_no: u64,
        pp_seq_no: u64,
        ledger_id: LedgerId,
        txn_root: RootHash,
        state_root: RootHash,
        pp_time: u64,
        primaries: Vec<NodeId>,
        has_audit_txn: bool,
    ) -> Self {
        Self {
            view_no,
            pp_seq_no,
            ledger_id,
            txn_root,
            state_root,
            pp_time,
            primaries,
            has_audit_txn,
        }
    }
}
