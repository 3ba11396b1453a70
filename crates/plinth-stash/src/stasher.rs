use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use tracing::{debug, warn};

use plinth_types::NodeId;

/// Why a message cannot be processed right now. These are the only
/// recognized buckets; anything else is unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StashReason {
    /// The replica is catching up and must not order for this ledger.
    CatchUp,
    /// The message's sequence number is outside the watermark window.
    Watermarks,
    /// The replica is mid view-change.
    View,
}

impl fmt::Display for StashReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StashReason::CatchUp => "CATCH_UP",
            StashReason::Watermarks => "WATERMARKS",
            StashReason::View => "VIEW",
        };
        f.write_str(name)
    }
}

/// What the inbound path decided about a replayed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Handled; nothing left to do.
    Processed,
    /// Dropped by validation; nothing left to do.
    Discarded,
    /// A different condition now blocks the message: stash it again.
    Stash {
        reason: StashReason,
        explanation: String,
    },
}

/// Counts from one drain pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub processed: usize,
    pub restashed: usize,
    pub dropped: usize,
}

/// Set of reasons a message has already been stashed under. A message
/// is stashed at most once per distinct reason, which bounds replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ReasonSet(u8);

impl ReasonSet {
    fn bit(reason: StashReason) -> u8 {
        match reason {
            StashReason::CatchUp => 1,
            StashReason::Watermarks => 2,
            StashReason::View => 4,
        }
    }

    fn insert(&mut self, reason: StashReason) {
        self.0 |= Self::bit(reason);
    }

    fn contains(&self, reason: StashReason) -> bool {
        self.0 & Self::bit(reason) != 0
    }
}

struct StashedEntry<M> {
    explanation: String,
    message: M,
    sender: NodeId,
    seen: ReasonSet,
}

/// Per-replica message buffer, one append-ordered bucket per reason.
///
/// Buckets are drained independently by the replica's lifecycle
/// triggers; replay preserves arrival order within a bucket, and there
/// is no cross-bucket ordering guarantee. No size bound is enforced
/// here: overflow protection is the caller's watermark/backpressure
/// policy.
pub struct Stasher<M> {
    buckets: BTreeMap<StashReason, VecDeque<StashedEntry<M>>>,
}

impl<M> Stasher<M> {
    pub fn new() -> Self {
        let mut buckets = BTreeMap::new();
        for reason in [StashReason::CatchUp, StashReason::Watermarks, StashReason::View] {
            buckets.insert(reason, VecDeque::new());
        }
        Self { buckets }
    }

    /// Buffer a message under `reason`.
    pub fn stash(
        &mut self,
        reason: StashReason,
        explanation: impl Into<String>,
        message: M,
        sender: NodeId,
    ) {
        let explanation = explanation.into();
        debug!(%reason, %sender, %explanation, "stashing message");
        let mut seen = ReasonSet::default();
        seen.insert(reason);
        self.bucket_mut(reason).push_back(StashedEntry {
            explanation,
            message,
            sender,
            seen,
        });
    }

    /// Number of messages currently stashed under `reason`.
    pub fn stash_size(&self, reason: StashReason) -> usize {
        self.buckets.get(&reason).map_or(0, VecDeque::len)
    }

    /// Messages stashed across all buckets.
    pub fn total_size(&self) -> usize {
        self.buckets.values().map(VecDeque::len).sum()
    }

    /// Catch-up completed: replay the `CatchUp` bucket.
    pub fn on_catch_up_finished<F>(&mut self, process: F) -> DrainSummary
    where
        F: FnMut(&M, &NodeId) -> Disposition,
    {
        self.drain(StashReason::CatchUp, process)
    }

    /// View change completed: replay the `View` bucket.
    pub fn on_view_change_done<F>(&mut self, process: F) -> DrainSummary
    where
        F: FnMut(&M, &NodeId) -> Disposition,
    {
        self.drain(StashReason::View, process)
    }

    /// The low watermark advanced: replay the `Watermarks` bucket.
    pub fn on_watermarks_changed<F>(&mut self, process: F) -> DrainSummary
    where
        F: FnMut(&M, &NodeId) -> Disposition,
    {
        self.drain(StashReason::Watermarks, process)
    }

    /// Replay one bucket in FIFO order through `process`, the normal
    /// inbound-message path. The pass is bounded: it iterates a
    /// snapshot of the bucket, and a message may move to a bucket it
    /// has not visited before, at most once per distinct reason. After
    /// the pass the drained bucket holds only what `process` itself
    /// re-enqueued via other buckets, never the drained messages.
    fn drain<F>(&mut self, reason: StashReason, mut process: F) -> DrainSummary
    where
        F: FnMut(&M, &NodeId) -> Disposition,
    {
        let entries = std::mem::take(self.bucket_mut(reason));
        let mut summary = DrainSummary::default();
        debug!(%reason, count = entries.len(), "draining stash");

        for entry in entries {
            match process(&entry.message, &entry.sender) {
                Disposition::Processed => summary.processed += 1,
                Disposition::Discarded => summary.dropped += 1,
                Disposition::Stash {
                    reason: new_reason,
                    explanation,
                } => {
                    if entry.seen.contains(new_reason) {
                        // Re-stashing under a visited reason would loop.
                        warn!(
                            drained = %reason,
                            requested = %new_reason,
                            sender = %entry.sender,
                            stashed_for = %entry.explanation,
                            "dropping message re-stashed under an already-visited reason"
                        );
                        summary.dropped += 1;
                        continue;
                    }
                    let mut seen = entry.seen;
                    seen.insert(new_reason);
                    self.bucket_mut(new_reason).push_back(StashedEntry {
                        explanation,
                        message: entry.message,
                        sender: entry.sender,
                        seen,
                    });
                    summary.restashed += 1;
                }
            }
        }
        summary
    }

    fn bucket_mut(&mut self, reason: StashReason) -> &mut VecDeque<StashedEntry<M>> {
        self.buckets
            .get_mut(&reason)
            .expect("all reason buckets exist from construction")
    }
}

impl<M> Default for Stasher<M> {
    fn default() -> Self {
        Self::new()
    }
}
