use std::collections::BTreeMap;
use std::sync::RwLock;

use plinth_types::{LedgerId, LedgerTxn, RootHash};

use crate::error::LedgerError;
use crate::traits::{Ledger, State};

/// In-memory [`Ledger`] implementation for tests, local demos, and
/// embedding.
///
/// Entry roots are hash-chained, and one chained root is kept per
/// position so that discarding pending entries restores the exact
/// prior root.
pub struct InMemoryLedger {
    ledger_id: LedgerId,
    inner: RwLock<LedgerInner>,
}

#[derive(Default)]
struct LedgerInner {
    committed_size: u64,
    /// Committed prefix followed by the pending suffix.
    txns: Vec<LedgerTxn>,
    /// Chained root after each entry; `roots[i]` covers `txns[..=i]`.
    roots: Vec<RootHash>,
}

impl InMemoryLedger {
    pub fn new(ledger_id: LedgerId) -> Self {
        Self {
            ledger_id,
            inner: RwLock::new(LedgerInner::default()),
        }
    }

    pub fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }
}

impl Ledger for InMemoryLedger {
    fn size(&self) -> Result<u64, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("ledger read lock poisoned".into()))?;
        Ok(inner.committed_size)
    }

    fn uncommitted_size(&self) -> Result<u64, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("ledger read lock poisoned".into()))?;
        Ok(inner.txns.len() as u64)
    }

    fn root_hash(&self) -> Result<RootHash, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("ledger read lock poisoned".into()))?;
        Ok(match inner.committed_size {
            0 => RootHash::empty(),
            n => inner.roots[n as usize - 1],
        })
    }

    fn uncommitted_root_hash(&self) -> Result<RootHash, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("ledger read lock poisoned".into()))?;
        Ok(inner.roots.last().copied().unwrap_or(RootHash::empty()))
    }

    fn append(&self, txns: Vec<LedgerTxn>) -> Result<(), LedgerError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::LockPoisoned("ledger write lock poisoned".into()))?;
        for mut txn in txns {
            txn.seq_no = Some(inner.txns.len() as u64 + 1);
            let prev = inner.roots.last().copied().unwrap_or(RootHash::empty());
            let next = chain_root(prev, &txn)?;
            inner.txns.push(txn);
            inner.roots.push(next);
        }
        Ok(())
    }

    fn commit(&self, count: u64) -> Result<Vec<LedgerTxn>, LedgerError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::LockPoisoned("ledger write lock poisoned".into()))?;
        let pending = inner.txns.len() as u64 - inner.committed_size;
        if count > pending {
            return Err(LedgerError::CommitOverflow { requested: count, pending });
        }
        let start = inner.committed_size as usize;
        inner.committed_size += count;
        let end = inner.committed_size as usize;
        Ok(inner.txns[start..end].to_vec())
    }

    fn discard(&self, count: u64) -> Result<(), LedgerError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::LockPoisoned("ledger write lock poisoned".into()))?;
        let pending = inner.txns.len() as u64 - inner.committed_size;
        if count > pending {
            return Err(LedgerError::DiscardOverflow { requested: count, pending });
        }
        let keep = inner.txns.len() - count as usize;
        inner.txns.truncate(keep);
        inner.roots.truncate(keep);
        Ok(())
    }

    fn get(&self, seq_no: u64) -> Result<Option<LedgerTxn>, LedgerError> {
        if seq_no == 0 {
            return Ok(None);
        }
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("ledger read lock poisoned".into()))?;
        Ok(inner.txns.get(seq_no as usize - 1).cloned())
    }

    fn get_last_txn(&self) -> Result<Option<LedgerTxn>, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("ledger read lock poisoned".into()))?;
        Ok(inner.txns.last().cloned())
    }
}

fn chain_root(prev: RootHash, txn: &LedgerTxn) -> Result<RootHash, LedgerError> {
    let encoded =
        serde_json::to_vec(txn).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"plinth-txn-v1:");
    hasher.update(prev.as_bytes());
    hasher.update(&encoded);
    Ok(RootHash::from_bytes(*hasher.finalize().as_bytes()))
}

/// In-memory [`State`] implementation: a linear history of versions,
/// one per write, with a deterministic root per version. Mimics the
/// versioned-trie behaviors the handlers rely on: committing to a root
/// behind the head, and reverting the head to an earlier version.
pub struct InMemoryState {
    ledger_id: LedgerId,
    inner: RwLock<StateInner>,
}

struct StateInner {
    /// Version history, oldest first; never empty (starts at the empty
    /// version).
    versions: Vec<(RootHash, BTreeMap<Vec<u8>, Vec<u8>>)>,
    /// Index of the committed version within `versions`.
    committed_idx: usize,
}

impl InMemoryState {
    pub fn new(ledger_id: LedgerId) -> Self {
        Self {
            ledger_id,
            inner: RwLock::new(StateInner {
                versions: vec![(map_root(std::iter::empty::<(Vec<u8>, Vec<u8>)>()), BTreeMap::new())],
                committed_idx: 0,
            }),
        }
    }
}

fn map_root(entries: impl Iterator<Item = (Vec<u8>, Vec<u8>)>) -> RootHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"plinth-state-v1:");
    for (key, value) in entries {
        hasher.update(&(key.len() as u64).to_le_bytes());
        hasher.update(&key);
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(&value);
    }
    RootHash::from_bytes(*hasher.finalize().as_bytes())
}

impl StateInner {
    fn head(&self) -> &(RootHash, BTreeMap<Vec<u8>, Vec<u8>>) {
        self.versions.last().expect("history never empty")
    }

    /// Position of `root` among the committed version and everything
    /// after it.
    fn find(&self, root: RootHash) -> Option<usize> {
        (self.committed_idx..self.versions.len()).find(|&i| self.versions[i].0 == root)
    }
}

impl State for InMemoryState {
    fn root_hash(&self) -> Result<RootHash, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("state read lock poisoned".into()))?;
        Ok(inner.head().0)
    }

    fn committed_root_hash(&self) -> Result<RootHash, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("state read lock poisoned".into()))?;
        Ok(inner.versions[inner.committed_idx].0)
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), LedgerError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::LockPoisoned("state write lock poisoned".into()))?;
        let mut map = inner.head().1.clone();
        map.insert(key, value);
        let root = map_root(map.clone().into_iter());
        if root != inner.head().0 {
            inner.versions.push((root, map));
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("state read lock poisoned".into()))?;
        Ok(inner.head().1.get(key).cloned())
    }

    fn commit(&self, root: RootHash) -> Result<(), LedgerError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::LockPoisoned("state write lock poisoned".into()))?;
        let idx = inner.find(root).ok_or(LedgerError::RootMismatch {
            ledger_id: self.ledger_id,
            expected: root,
            actual: inner.head().0,
        })?;
        inner.committed_idx = idx;
        Ok(())
    }

    fn revert_to_head(&self, root: RootHash) -> Result<(), LedgerError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::LockPoisoned("state write lock poisoned".into()))?;
        let idx = inner.find(root).ok_or(LedgerError::RootMismatch {
            ledger_id: self.ledger_id,
            expected: root,
            actual: inner.head().0,
        })?;
        inner.versions.truncate(idx + 1);
        Ok(())
    }
}
