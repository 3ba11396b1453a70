use std::collections::VecDeque;

use plinth_types::RootHash;
use thiserror::Error;

/// Fatal misuses of the tracker. These indicate a bug in the calling
/// driver (out-of-order rollback, commit past the pending boundary) and
/// must halt processing of the offending batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("commit of {requested} txns exceeds {pending} tracked pending txns")]
    Underflow { requested: u64, pending: u64 },

    #[error("commit of {requested} txns does not align to a batch boundary at {boundary}")]
    MisalignedCommit { requested: u64, boundary: u64 },

    #[error("no pending batches tracked")]
    NothingPending,

    #[error("reported uncommitted size {reported} is below the tracked total {tracked}")]
    Shrunk { tracked: u64, reported: u64 },
}

/// Per-ledger bookkeeping of applied-but-not-committed batches.
///
/// Purely in-memory counters with no I/O: the durable commit/discard
/// happens in the ledger itself, driven by the counts this tracker
/// returns. Each pending entry is `(marker, txn_count)` for one applied
/// batch, FIFO between commit points.
///
/// Invariant: the sum of tracked pending sizes always equals
/// `ledger.uncommitted_size() - ledger.size()`.
#[derive(Debug, Clone)]
pub struct LedgerUncommittedTracker {
    committed_size: u64,
    last_committed_marker: Option<RootHash>,
    pending: VecDeque<(Option<RootHash>, u64)>,
}

impl LedgerUncommittedTracker {
    /// Start tracking a ledger whose committed size is `committed_size`.
    /// `marker` is the root at that commit point, when the caller has one.
    pub fn new(marker: Option<RootHash>, committed_size: u64) -> Self {
        Self {
            committed_size,
            last_committed_marker: marker,
            pending: VecDeque::new(),
        }
    }

    /// Record that the ledger grew to `new_uncommitted_size` by applying
    /// one batch. Returns the marker and the batch's txn count. A size
    /// below the tracked total is fatal.
    pub fn apply_batch(
        &mut self,
        marker: Option<RootHash>,
        new_uncommitted_size: u64,
    ) -> Result<(Option<RootHash>, u64), TrackerError> {
        let tracked = self.committed_size + self.sum_pending();
        if new_uncommitted_size < tracked {
            return Err(TrackerError::Shrunk {
                tracked,
                reported: new_uncommitted_size,
            });
        }
        let delta = new_uncommitted_size - tracked;
        self.pending.push_back((marker, delta));
        Ok((marker, delta))
    }

    /// Remove the oldest pending batches covering exactly `count` txns
    /// and advance the commit point. Returns the marker of the last
    /// batch consumed, for the caller to pass to the ledger commit.
    /// `count` overshooting the pending total, or splitting a batch, is
    /// fatal.
    pub fn commit_batch(&mut self, count: u64) -> Result<(Option<RootHash>, u64), TrackerError> {
        if self.pending.is_empty() {
            return Err(TrackerError::NothingPending);
        }
        let pending_total = self.sum_pending();
        if count > pending_total {
            return Err(TrackerError::Underflow {
                requested: count,
                pending: pending_total,
            });
        }
        let mut consumed = 0u64;
        let mut marker = None;
        let mut popped_any = false;
        while consumed < count || !popped_any {
            let Some(&(_, front)) = self.pending.front() else {
                return Err(TrackerError::NothingPending);
            };
            if consumed + front > count {
                return Err(TrackerError::MisalignedCommit {
                    requested: count,
                    boundary: consumed + front,
                });
            }
            let (m, c) = self
                .pending
                .pop_front()
                .ok_or(TrackerError::NothingPending)?;
            consumed += c;
            marker = m;
            popped_any = true;
        }
        self.committed_size += count;
        self.last_committed_marker = marker;
        Ok((marker, count))
    }

    /// Remove the single most recently applied batch. Rollbacks must be
    /// issued newest-first; calling this with nothing pending is fatal
    /// misuse.
    pub fn reject_batch(&mut self) -> Result<(Option<RootHash>, u64), TrackerError> {
        self.pending.pop_back().ok_or(TrackerError::NothingPending)
    }

    /// Total pending txns across tracked batches.
    pub fn sum_pending(&self) -> u64 {
        self.pending.iter().map(|(_, c)| c).sum()
    }

    /// Number of pending batches tracked.
    pub fn pending_batches(&self) -> usize {
        self.pending.len()
    }

    /// Txn count of the oldest pending batch, if any.
    pub fn front_batch_size(&self) -> Option<u64> {
        self.pending.front().map(|&(_, c)| c)
    }

    /// Committed size as of the last commit point.
    pub fn committed_size(&self) -> u64 {
        self.committed_size
    }

    /// Marker recorded at the last commit point.
    pub fn last_committed_marker(&self) -> Option<RootHash> {
        self.last_committed_marker
    }

    /// Marker of the newest tracked batch, falling back to the last
    /// commit point when nothing is pending. After a reject this is the
    /// root the ledger's state must revert to.
    pub fn head_marker(&self) -> Option<RootHash> {
        self.pending
            .back()
            .and_then(|&(m, _)| m)
            .or(self.last_committed_marker)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn marker(b: u8) -> Option<RootHash> {
        Some(RootHash::from_bytes([b; 32]))
    }

    #[test]
    fn apply_records_the_delta() {
        let mut tracker = LedgerUncommittedTracker::new(None, 10);
        assert_eq!(tracker.apply_batch(marker(1), 13).unwrap(), (marker(1), 3));
        assert_eq!(tracker.apply_batch(marker(2), 14).unwrap(), (marker(2), 1));
        assert_eq!(tracker.sum_pending(), 4);
        assert_eq!(tracker.pending_batches(), 2);
    }

    #[test]
    fn apply_with_shrunk_size_is_fatal() {
        let mut tracker = LedgerUncommittedTracker::new(None, 10);
        tracker.apply_batch(None, 12).unwrap();
        let err = tracker.apply_batch(None, 11).unwrap_err();
        assert_eq!(err, TrackerError::Shrunk { tracked: 12, reported: 11 });
    }

    #[test]
    fn commit_pops_oldest_first() {
        let mut tracker = LedgerUncommittedTracker::new(None, 0);
        tracker.apply_batch(marker(1), 2).unwrap();
        tracker.apply_batch(marker(2), 5).unwrap();
        assert_eq!(tracker.commit_batch(2).unwrap(), (marker(1), 2));
        assert_eq!(tracker.committed_size(), 2);
        assert_eq!(tracker.sum_pending(), 3);
        assert_eq!(tracker.last_committed_marker(), marker(1));
    }

    #[test]
    fn commit_spanning_batches_returns_last_marker() {
        let mut tracker = LedgerUncommittedTracker::new(None, 0);
        tracker.apply_batch(marker(1), 2).unwrap();
        tracker.apply_batch(marker(2), 5).unwrap();
        assert_eq!(tracker.commit_batch(5).unwrap(), (marker(2), 5));
        assert_eq!(tracker.pending_batches(), 0);
    }

    #[test]
    fn commit_underflow_is_fatal() {
        let mut tracker = LedgerUncommittedTracker::new(None, 0);
        tracker.apply_batch(None, 2).unwrap();
        assert_eq!(
            tracker.commit_batch(3).unwrap_err(),
            TrackerError::Underflow { requested: 3, pending: 2 }
        );
    }

    #[test]
    fn commit_mid_batch_is_fatal() {
        let mut tracker = LedgerUncommittedTracker::new(None, 0);
        tracker.apply_batch(None, 3).unwrap();
        assert_eq!(
            tracker.commit_batch(2).unwrap_err(),
            TrackerError::MisalignedCommit { requested: 2, boundary: 3 }
        );
    }

    #[test]
    fn commit_with_nothing_pending_is_fatal() {
        let mut tracker = LedgerUncommittedTracker::new(None, 5);
        assert_eq!(tracker.commit_batch(0).unwrap_err(), TrackerError::NothingPending);
    }

    #[test]
    fn reject_pops_newest_and_is_a_true_inverse() {
        let mut tracker = LedgerUncommittedTracker::new(None, 0);
        tracker.apply_batch(marker(1), 2).unwrap();
        let before = tracker.sum_pending();
        tracker.apply_batch(marker(2), 6).unwrap();
        assert_eq!(tracker.reject_batch().unwrap(), (marker(2), 4));
        assert_eq!(tracker.sum_pending(), before);
        assert_eq!(tracker.reject_batch().unwrap(), (marker(1), 2));
        assert_eq!(tracker.reject_batch().unwrap_err(), TrackerError::NothingPending);
    }

    #[test]
    fn zero_size_batch_is_still_committed() {
        let mut tracker = LedgerUncommittedTracker::new(None, 0);
        tracker.apply_batch(marker(1), 0).unwrap();
        assert_eq!(tracker.commit_batch(0).unwrap(), (marker(1), 0));
        assert_eq!(tracker.pending_batches(), 0);
    }

    proptest! {
        // The tracked pending total must mirror the ledger's
        // uncommitted-minus-committed gap after any operation sequence.
        #[test]
        fn pending_sum_mirrors_the_ledger_gap(ops in prop::collection::vec(0u8..3, 1..50)) {
            let mut tracker = LedgerUncommittedTracker::new(None, 0);
            // Model ledger: (committed, total).
            let mut committed = 0u64;
            let mut total = 0u64;
            let mut sizes: Vec<u64> = Vec::new();

            for (i, op) in ops.into_iter().enumerate() {
                match op {
                    // apply a batch of 1..=3 txns
                    0 => {
                        let grow = (i as u64 % 3) + 1;
                        total += grow;
                        tracker.apply_batch(None, total).unwrap();
                        sizes.push(grow);
                    }
                    // commit the oldest batch
                    1 => {
                        if !sizes.is_empty() {
                            let count = sizes.remove(0);
                            let (_, c) = tracker.commit_batch(count).unwrap();
                            committed += c;
                        }
                    }
                    // reject the newest batch
                    _ => {
                        if !sizes.is_empty() {
                            let count = sizes.pop().unwrap();
                            let (_, c) = tracker.reject_batch().unwrap();
                            prop_assert_eq!(c, count);
                            total -= c;
                        }
                    }
                }
                prop_assert_eq!(tracker.sum_pending(), total - committed);
                prop_assert_eq!(tracker.committed_size(), committed);
            }
        }
    }
}
