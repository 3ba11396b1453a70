//! Foundation types for the Plinth validator core.
//!
//! This crate provides the identity, batch, and audit-schema types used
//! throughout the batch-ordering and catch-up-consistency subsystem.
//! Every other `plinth` crate depends on `plinth-types`.
//!
//! # Key Types
//!
//! - [`LedgerId`]: integer identity of a ledger (pool, domain, config, audit)
//! - [`NodeId`]: name of a validator node; primaries are ordered lists of these
//! - [`RootHash`]: 32-byte merkle/trie root, hex-encoded when serialized
//! - [`ThreePcBatch`]: immutable description of one ordered consensus batch
//! - [`AuditTxn`]: payload of an audit-ledger entry, with delta-encoded
//!   [`RootRef`] and [`PrimariesRef`] fields
//! - [`LedgerTxn`]: envelope every ledger entry travels in

pub mod audit;
pub mod batch;
pub mod error;
pub mod hash;
pub mod ids;
pub mod txn;

pub use audit::{AuditTxn, PrimariesRef, RootRef, AUDIT_TXN_VERSION};
pub use batch::ThreePcBatch;
pub use error::TypeError;
pub use hash::RootHash;
pub use ids::{LedgerId, NodeId};
pub use txn::{LedgerTxn, TxnPayload};
