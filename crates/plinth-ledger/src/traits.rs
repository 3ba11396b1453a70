use plinth_types::{LedgerTxn, RootHash};

use crate::error::LedgerError;

/// Boundary over an append-only transaction ledger with a
/// committed/uncommitted split.
///
/// Entries appended through [`Ledger::append`] are pending until
/// [`Ledger::commit`] moves them across the committed boundary or
/// [`Ledger::discard`] drops them. Sequence numbers are 1-based and
/// contiguous across the committed and pending regions.
///
/// Methods take `&self`; implementations guard their interior state and
/// surface lock poisoning as [`LedgerError::LockPoisoned`] rather than
/// panicking, so a crashed thread in the embedding host cannot take the
/// whole node down through a getter.
pub trait Ledger: Send + Sync {
    /// Number of committed entries.
    fn size(&self) -> Result<u64, LedgerError>;

    /// Number of committed plus pending entries.
    fn uncommitted_size(&self) -> Result<u64, LedgerError>;

    /// Root over the committed entries only.
    fn root_hash(&self) -> Result<RootHash, LedgerError>;

    /// Root over committed and pending entries.
    fn uncommitted_root_hash(&self) -> Result<RootHash, LedgerError>;

    /// Append entries to the pending region, assigning sequence numbers.
    fn append(&self, txns: Vec<LedgerTxn>) -> Result<(), LedgerError>;

    /// Durably commit the oldest `count` pending entries and return them.
    fn commit(&self, count: u64) -> Result<Vec<LedgerTxn>, LedgerError>;

    /// Drop the newest `count` pending entries.
    fn discard(&self, count: u64) -> Result<(), LedgerError>;

    /// Entry at `seq_no` (1-based), committed or pending.
    fn get(&self, seq_no: u64) -> Result<Option<LedgerTxn>, LedgerError>;

    /// The newest entry, pending entries included.
    fn get_last_txn(&self) -> Result<Option<LedgerTxn>, LedgerError>;
}

impl std::fmt::Debug for dyn Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Ledger")
    }
}

/// Boundary over a versioned key-value state trie.
///
/// Every write produces a new head version; the committed pointer
/// trails the head. [`State::commit`] advances the committed pointer to
/// a given root (which may sit behind the head while later batches are
/// still pending), and [`State::revert_to_head`] discards uncommitted
/// versions newer than a given root.
pub trait State: Send + Sync {
    /// Root of the head version, uncommitted writes included.
    fn root_hash(&self) -> Result<RootHash, LedgerError>;

    /// Root of the committed version.
    fn committed_root_hash(&self) -> Result<RootHash, LedgerError>;

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), LedgerError>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Advance the committed pointer to the version with `root`. Fails
    /// with [`LedgerError::RootMismatch`] if no uncommitted version has
    /// that root.
    fn commit(&self, root: RootHash) -> Result<(), LedgerError>;

    /// Make the version with `root` the head again, discarding every
    /// newer uncommitted version. Fails with
    /// [`LedgerError::RootMismatch`] if `root` names no version at or
    /// after the committed pointer.
    fn revert_to_head(&self, root: RootHash) -> Result<(), LedgerError>;
}

impl std::fmt::Debug for dyn State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn State")
    }
}
