use serde::{Deserialize, Serialize};

use crate::audit::AuditTxn;

/// Payload of a ledger entry.
///
/// The audit ledger stores [`AuditTxn`]s; every other ledger stores
/// opaque request payloads this subsystem never interprets. Untagged on
/// the wire, so an audit entry persists as the flat audit schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TxnPayload {
    Audit(AuditTxn),
    Raw(serde_json::Value),
}

impl TxnPayload {
    pub fn as_audit(&self) -> Option<&AuditTxn> {
        match self {
            TxnPayload::Audit(txn) => Some(txn),
            TxnPayload::Raw(_) => None,
        }
    }
}

/// Envelope every ledger entry travels in: the payload plus metadata
/// assigned when the entry is appended and ordered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerTxn {
    /// 1-based position in the ledger, assigned on append.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<u64>,
    /// Batch ordering time (epoch seconds), if the entry came from a batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub payload: TxnPayload,
}

impl LedgerTxn {
    /// An entry carrying an audit payload, not yet appended.
    pub fn audit(txn: AuditTxn, timestamp: u64) -> Self {
        Self {
            seq_no: None,
            timestamp: Some(timestamp),
            payload: TxnPayload::Audit(txn),
        }
    }

    /// An entry carrying an opaque request payload, not yet appended.
    pub fn raw(payload: serde_json::Value) -> Self {
        Self {
            seq_no: None,
            timestamp: None,
            payload: TxnPayload::Raw(payload),
        }
    }

    pub fn as_audit(&self) -> Option<&AuditTxn> {
        self.payload.as_audit()
    }
}
