use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::RootHash;
use crate::ids::{LedgerId, NodeId};

/// Schema version written into every audit entry.
pub const AUDIT_TXN_VERSION: &str = "1";

/// A ledger root recorded in an audit entry: either the literal root
/// (the ledger changed in this batch) or a positive delta meaning "root
/// unchanged; the true root is `delta` audit entries back".
///
/// The variant is decided at construction time, never inferred at read
/// time. On the wire a literal is a hex string and a delta an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RootRef {
    Literal(RootHash),
    Delta(u64),
}

impl RootRef {
    pub fn is_literal(&self) -> bool {
        matches!(self, RootRef::Literal(_))
    }

    pub fn as_delta(&self) -> Option<u64> {
        match self {
            RootRef::Delta(d) => Some(*d),
            RootRef::Literal(_) => None,
        }
    }
}

/// The primaries field of an audit entry: either the literal ordered
/// primary list, or a positive delta meaning "identical to the primaries
/// recorded `delta` audit entries back". The delta is always computed
/// relative to the last entry holding a literal list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimariesRef {
    Literal(Vec<NodeId>),
    Delta(u64),
}

impl PrimariesRef {
    pub fn is_literal(&self) -> bool {
        matches!(self, PrimariesRef::Literal(_))
    }

    pub fn as_delta(&self) -> Option<u64> {
        match self {
            PrimariesRef::Delta(d) => Some(*d),
            PrimariesRef::Literal(_) => None,
        }
    }
}

/// Payload of one audit-ledger entry.
///
/// Appended once per ordered batch and never mutated afterwards. The
/// delta encoding of `ledger_root` and `primaries` bounds entry size to
/// the number of active ledgers regardless of history length, while
/// still letting any node reconstruct the exact roots and primaries of
/// any past batch by walking backward through deltas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTxn {
    pub version: String,
    pub view_no: u64,
    pub pp_seq_no: u64,
    /// Uncommitted size of every non-audit ledger at the time of the batch.
    pub ledgers_size: BTreeMap<LedgerId, u64>,
    /// Root (or delta back-reference) per audited ledger. A ledger absent
    /// from this map has never been audited.
    pub ledger_root: BTreeMap<LedgerId, RootRef>,
    /// State root for the single ledger this batch actually modified.
    pub state_root: BTreeMap<LedgerId, RootHash>,
    /// Primaries literal or delta; `None` only in legacy data.
    pub primaries: Option<PrimariesRef>,
}

impl AuditTxn {
    /// Load an audit entry from its textual form, normalizing the string
    /// map keys JSON produces back into integer ledger ids and rejecting
    /// malformed delta values.
    pub fn from_json(value: serde_json::Value) -> Result<Self, TypeError> {
        let txn: AuditTxn =
            serde_json::from_value(value).map_err(|e| TypeError::Serialization(e.to_string()))?;
        txn.validate()?;
        Ok(txn)
    }

    /// Check the delta invariants: every stored delta is strictly positive.
    pub fn validate(&self) -> Result<(), TypeError> {
        for (lid, root) in &self.ledger_root {
            if root.as_delta() == Some(0) {
                return Err(TypeError::InvalidDelta(format!(
                    "ledger_root[{lid}] holds delta 0 at pp_seq_no {}",
                    self.pp_seq_no
                )));
            }
        }
        if let Some(PrimariesRef::Delta(0)) = self.primaries {
            return Err(TypeError::InvalidDelta(format!(
                "primaries holds delta 0 at pp_seq_no {}",
                self.pp_seq_no
            )));
        }
        Ok(())
    }
}
