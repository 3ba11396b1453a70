use std::sync::{Arc, RwLock};

use tracing::debug;

use plinth_ledger::{DatabaseManager, Ledger, LedgerError, LedgerUncommittedTracker, TrackerError};
use plinth_types::{
    AuditTxn, LedgerId, LedgerTxn, NodeId, PrimariesRef, RootHash, RootRef, ThreePcBatch,
    AUDIT_TXN_VERSION,
};

use crate::error::BatchError;
use crate::handler::{BatchRequestHandler, HandlerResult};

/// Batch handler for the audit ledger.
///
/// On every batch applied to any ledger, appends one compact audit
/// entry recording each ledger's uncommitted size, its root (literal
/// when changed in this batch, otherwise a delta back-reference), the
/// modified ledger's state root, and the active primaries (literal or
/// delta). The delta scheme bounds entry size to the number of active
/// ledgers while letting any node reconstruct the exact roots and
/// primaries of any past batch by walking backward, which is what
/// catch-up consistency-checking depends on.
pub struct AuditBatchHandler {
    database_manager: Arc<DatabaseManager>,
    ledger: Arc<dyn Ledger>,
    tracker: RwLock<LedgerUncommittedTracker>,
}

impl AuditBatchHandler {
    pub fn new(database_manager: Arc<DatabaseManager>) -> Result<Self, BatchError> {
        let ledger = database_manager.get_ledger(LedgerId::AUDIT)?;
        let tracker = LedgerUncommittedTracker::new(None, ledger.size()?);
        Ok(Self {
            database_manager,
            ledger,
            tracker: RwLock::new(tracker),
        })
    }

    /// Build the audit entry for `batch`, delta-encoding unchanged
    /// fields against the previous entry (`last`, pending included).
    fn build_audit_txn(
        &self,
        batch: &ThreePcBatch,
        last: Option<&LedgerTxn>,
    ) -> Result<AuditTxn, BatchError> {
        let last_data = match last {
            None => None,
            Some(txn) => Some(self.audit_payload(batch, txn)?),
        };

        let mut txn = AuditTxn {
            version: AUDIT_TXN_VERSION.to_string(),
            view_no: batch.view_no,
            pp_seq_no: batch.pp_seq_no,
            ledgers_size: Default::default(),
            ledger_root: Default::default(),
            state_root: Default::default(),
            primaries: None,
        };

        for lid in self.database_manager.ledger_ids()? {
            if lid == LedgerId::AUDIT {
                continue;
            }
            let ledger = self.database_manager.get_ledger(lid)?;
            txn.ledgers_size.insert(lid, ledger.uncommitted_size()?);
            fill_ledger_root(&mut txn, batch, lid, last_data);
        }

        txn.state_root.insert(batch.ledger_id, batch.state_root);

        txn.primaries = Some(self.fill_primaries(batch, last, last_data)?);

        Ok(txn)
    }

    /// Choose the primaries encoding per the previous entry's form.
    fn fill_primaries(
        &self,
        batch: &ThreePcBatch,
        last: Option<&LedgerTxn>,
        last_data: Option<&AuditTxn>,
    ) -> Result<PrimariesRef, BatchError> {
        let current = &batch.primaries;

        // First audit entry ever: store the literal list.
        let (Some(last_txn), Some(last_data)) = (last, last_data) else {
            return Ok(PrimariesRef::Literal(current.clone()));
        };
        let last_seq_no = entry_seq_no(batch, last_txn)?;

        match &last_data.primaries {
            // Previous entry holds the literal list: unchanged -> delta 1.
            Some(PrimariesRef::Literal(list)) => {
                if list == current {
                    Ok(PrimariesRef::Delta(1))
                } else {
                    Ok(PrimariesRef::Literal(current.clone()))
                }
            }
            // Previous entry holds a delta: resolve the literal list it
            // points at and compare.
            Some(PrimariesRef::Delta(delta)) => {
                let uncommitted_size = self.ledger.uncommitted_size()?;
                if *delta >= uncommitted_size {
                    return Err(BatchError::DeltaOutOfRange {
                        view_no: batch.view_no,
                        pp_seq_no: batch.pp_seq_no,
                        seq_no: last_seq_no,
                        delta: *delta,
                        uncommitted_size,
                    });
                }
                let resolved_seq_no = last_seq_no - delta;
                let resolved = self.ledger.get(resolved_seq_no)?.ok_or(
                    BatchError::DeltaOutOfRange {
                        view_no: batch.view_no,
                        pp_seq_no: batch.pp_seq_no,
                        seq_no: last_seq_no,
                        delta: *delta,
                        uncommitted_size,
                    },
                )?;
                let resolved_data = self.audit_payload(batch, &resolved)?;
                match &resolved_data.primaries {
                    Some(PrimariesRef::Literal(list)) => {
                        if list == current {
                            Ok(PrimariesRef::Delta(delta + 1))
                        } else {
                            Ok(PrimariesRef::Literal(current.clone()))
                        }
                    }
                    // The back-reference must land on a literal list;
                    // anything else means the audit ledger is corrupt.
                    Some(PrimariesRef::Delta(_)) => Err(BatchError::CorruptPrimaries {
                        view_no: batch.view_no,
                        pp_seq_no: batch.pp_seq_no,
                        seq_no: resolved_seq_no,
                    }),
                    None => Err(BatchError::MissingPrimaries {
                        view_no: batch.view_no,
                        pp_seq_no: batch.pp_seq_no,
                        seq_no: resolved_seq_no,
                    }),
                }
            }
            // The previous entry recorded no primaries at all.
            None => Err(BatchError::MissingPrimaries {
                view_no: batch.view_no,
                pp_seq_no: batch.pp_seq_no,
                seq_no: last_seq_no,
            }),
        }
    }

    fn audit_payload<'a>(
        &self,
        batch: &ThreePcBatch,
        txn: &'a LedgerTxn,
    ) -> Result<&'a AuditTxn, BatchError> {
        txn.as_audit().ok_or(BatchError::CorruptAuditEntry {
            view_no: batch.view_no,
            pp_seq_no: batch.pp_seq_no,
            seq_no: txn.seq_no.unwrap_or(0),
            reason: "entry does not carry an audit payload".to_string(),
        })
    }

    /// Resolve the literal root of `ledger_id` as recorded at audit
    /// entry `seq_no`, walking delta back-references to the entry where
    /// the ledger last actually changed. `None` means the ledger had
    /// never been audited at that point.
    pub fn resolve_ledger_root(
        &self,
        seq_no: u64,
        ledger_id: LedgerId,
    ) -> Result<Option<RootHash>, BatchError> {
        let mut seq_no = seq_no;
        loop {
            let entry = self.get_audit_entry(seq_no)?;
            match entry.ledger_root.get(&ledger_id) {
                None => return Ok(None),
                Some(RootRef::Literal(root)) => return Ok(Some(*root)),
                Some(RootRef::Delta(delta)) => {
                    if *delta == 0 || *delta >= seq_no {
                        return Err(BatchError::DeltaOutOfRange {
                            view_no: entry.view_no,
                            pp_seq_no: entry.pp_seq_no,
                            seq_no,
                            delta: *delta,
                            uncommitted_size: self.ledger.uncommitted_size()?,
                        });
                    }
                    seq_no -= delta;
                }
            }
        }
    }

    /// Resolve the literal primaries recorded at audit entry `seq_no`,
    /// following at most one delta back-reference (the encoding keeps
    /// deltas relative to the last literal entry).
    pub fn resolve_primaries(&self, seq_no: u64) -> Result<Vec<NodeId>, BatchError> {
        let entry = self.get_audit_entry(seq_no)?;
        match &entry.primaries {
            Some(PrimariesRef::Literal(list)) => Ok(list.clone()),
            Some(PrimariesRef::Delta(delta)) => {
                if *delta == 0 || *delta >= seq_no {
                    return Err(BatchError::DeltaOutOfRange {
                        view_no: entry.view_no,
                        pp_seq_no: entry.pp_seq_no,
                        seq_no,
                        delta: *delta,
                        uncommitted_size: self.ledger.uncommitted_size()?,
                    });
                }
                let target_seq_no = seq_no - delta;
                let target = self.get_audit_entry(target_seq_no)?;
                match &target.primaries {
                    Some(PrimariesRef::Literal(list)) => Ok(list.clone()),
                    Some(PrimariesRef::Delta(_)) => Err(BatchError::CorruptPrimaries {
                        view_no: target.view_no,
                        pp_seq_no: target.pp_seq_no,
                        seq_no: target_seq_no,
                    }),
                    None => Err(BatchError::MissingPrimaries {
                        view_no: target.view_no,
                        pp_seq_no: target.pp_seq_no,
                        seq_no: target_seq_no,
                    }),
                }
            }
            None => Err(BatchError::MissingPrimaries {
                view_no: entry.view_no,
                pp_seq_no: entry.pp_seq_no,
                seq_no,
            }),
        }
    }

    fn get_audit_entry(&self, seq_no: u64) -> Result<AuditTxn, BatchError> {
        let txn = self
            .ledger
            .get(seq_no)?
            .ok_or(BatchError::CorruptAuditEntry {
                view_no: 0,
                pp_seq_no: 0,
                seq_no,
                reason: "no audit entry at this seq_no".to_string(),
            })?;
        let entry = txn
            .as_audit()
            .cloned()
            .ok_or(BatchError::CorruptAuditEntry {
                view_no: 0,
                pp_seq_no: 0,
                seq_no,
                reason: "entry does not carry an audit payload".to_string(),
            })?;
        entry.validate()?;
        Ok(entry)
    }
}

/// Root-hash encoding for one non-audit ledger, against the previous
/// audit entry.
fn fill_ledger_root(
    txn: &mut AuditTxn,
    batch: &ThreePcBatch,
    lid: LedgerId,
    last_data: Option<&AuditTxn>,
) {
    // Ledger changed in this batch: store the literal root.
    if lid == batch.ledger_id {
        txn.ledger_root.insert(lid, RootRef::Literal(batch.txn_root));
        return;
    }
    match last_data.and_then(|d| d.ledger_root.get(&lid)) {
        // Never audited: omit the key entirely.
        None => {}
        // Unchanged for `delta` entries already: one more back.
        Some(RootRef::Delta(delta)) => {
            txn.ledger_root.insert(lid, RootRef::Delta(delta + 1));
        }
        // Changed in the previous batch, unchanged now: one back.
        Some(RootRef::Literal(_)) => {
            txn.ledger_root.insert(lid, RootRef::Delta(1));
        }
    }
}

/// Sequence number of an already-appended audit entry; absence is a
/// corrupt-ledger condition.
fn entry_seq_no(batch: &ThreePcBatch, txn: &LedgerTxn) -> Result<u64, BatchError> {
    txn.seq_no.ok_or(BatchError::CorruptAuditEntry {
        view_no: batch.view_no,
        pp_seq_no: batch.pp_seq_no,
        seq_no: 0,
        reason: "appended entry has no seq_no".to_string(),
    })
}

impl BatchRequestHandler for AuditBatchHandler {
    fn ledger_id(&self) -> LedgerId {
        LedgerId::AUDIT
    }

    fn post_batch_applied(
        &self,
        batch: &ThreePcBatch,
        _prev_result: Option<&HandlerResult>,
    ) -> Result<Option<HandlerResult>, BatchError> {
        // Batches ordered before auditing existed carry no audit txn;
        // the tracker still records a zero-size entry so commit and
        // reject stay aligned one entry per batch.
        if batch.has_audit_txn {
            let last = self.ledger.get_last_txn()?;
            let txn = self.build_audit_txn(batch, last.as_ref())?;
            self.ledger
                .append(vec![LedgerTxn::audit(txn, batch.pp_time)])?;
        } else {
            debug!(
                view_no = batch.view_no,
                pp_seq_no = batch.pp_seq_no,
                "batch has no audit txn, skipping"
            );
        }
        let uncommitted = self.ledger.uncommitted_size()?;
        self.tracker
            .write()
            .map_err(|_| LedgerError::LockPoisoned("tracker lock poisoned".into()))?
            .apply_batch(None, uncommitted)?;
        Ok(None)
    }

    fn post_batch_rejected(
        &self,
        _ledger_id: LedgerId,
        _prev_result: Option<&HandlerResult>,
    ) -> Result<Option<HandlerResult>, BatchError> {
        let (_, count) = self
            .tracker
            .write()
            .map_err(|_| LedgerError::LockPoisoned("tracker lock poisoned".into()))?
            .reject_batch()?;
        self.ledger.discard(count)?;
        debug!(txns = count, "discarded rejected audit entries");
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
        debug!(
            view_no = batch.view_no,
            pp_seq_no = batch.pp_seq_no,
            txns = count,
            "committed audit entries"
        );
        Ok(txns)
    }
}

#[cfg(test)]
mod tests {
    use plinth_ledger::{InMemoryLedger, InMemoryState};
    use serde_json::json;

    use super::*;

    struct Fixture {
        handler: AuditBatchHandler,
        pool: Arc<InMemoryLedger>,
        domain: Arc<InMemoryLedger>,
        audit: Arc<InMemoryLedger>,
    }

    fn setup() -> Fixture {
        let manager = Arc::new(DatabaseManager::new());
        let pool = Arc::new(InMemoryLedger::new(LedgerId::POOL));
        let domain = Arc::new(InMemoryLedger::new(LedgerId::DOMAIN));
        let audit = Arc::new(InMemoryLedger::new(LedgerId::AUDIT));
        for (id, ledger) in [
            (LedgerId::POOL, pool.clone()),
            (LedgerId::DOMAIN, domain.clone()),
            (LedgerId::AUDIT, audit.clone()),
        ] {
            manager
                .register_new_database(id, ledger, Arc::new(InMemoryState::new(id)))
                .unwrap();
        }
        let handler = AuditBatchHandler::new(manager).unwrap();
        Fixture { handler, pool, domain, audit }
    }

    fn primaries(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::new(*n)).collect()
    }

    /// Append `txns` request entries to `ledger` and describe the
    /// resulting batch, as the ordering layer would.
    fn order_batch(
        fx: &Fixture,
        pp_seq_no: u64,
        ledger: &InMemoryLedger,
        names: &[&str],
        txns: u64,
    ) -> ThreePcBatch {
        let entries = (0..txns)
            .map(|i| LedgerTxn::raw(json!({ "batch": pp_seq_no, "i": i })))
            .collect();
        ledger.append(entries).unwrap();
        let batch = ThreePcBatch::new(
            0,
            pp_seq_no,
            ledger.ledger_id(),
            ledger.uncommitted_root_hash().unwrap(),
            RootHash::from_bytes([pp_seq_no as u8; 32]),
            1_700_000_000 + pp_seq_no,
            primaries(names),
            true,
        );
        fx.handler.post_batch_applied(&batch, None).unwrap();
        batch
    }

    fn last_entry(fx: &Fixture) -> AuditTxn {
        fx.audit
            .get_last_txn()
            .unwrap()
            .unwrap()
            .as_audit()
            .cloned()
            .unwrap()
    }

    #[test]
    fn first_entry_stores_literals_and_omits_unaudited_ledgers() {
        let fx = setup();
        let b1 = order_batch(&fx, 1, &fx.domain, &["Alpha", "Beta"], 2);

        let entry = last_entry(&fx);
        assert_eq!(entry.version, AUDIT_TXN_VERSION);
        assert_eq!(entry.view_no, 0);
        assert_eq!(entry.pp_seq_no, 1);
        assert_eq!(entry.ledgers_size.get(&LedgerId::POOL), Some(&0));
        assert_eq!(entry.ledgers_size.get(&LedgerId::DOMAIN), Some(&2));
        assert!(!entry.ledgers_size.contains_key(&LedgerId::AUDIT));
        assert_eq!(
            entry.ledger_root.get(&LedgerId::DOMAIN),
            Some(&RootRef::Literal(b1.txn_root))
        );
        // Pool has never been audited: no key at all.
        assert!(!entry.ledger_root.contains_key(&LedgerId::POOL));
        assert_eq!(entry.state_root.get(&LedgerId::DOMAIN), Some(&b1.state_root));
        assert_eq!(
            entry.primaries,
            Some(PrimariesRef::Literal(primaries(&["Alpha", "Beta"])))
        );
    }

    #[test]
    fn unchanged_primaries_become_delta_one() {
        let fx = setup();
        order_batch(&fx, 1, &fx.domain, &["Alpha", "Beta"], 2);
        let b2 = order_batch(&fx, 2, &fx.domain, &["Alpha", "Beta"], 1);

        let entry = last_entry(&fx);
        // Domain changed again: literal root.
        assert_eq!(
            entry.ledger_root.get(&LedgerId::DOMAIN),
            Some(&RootRef::Literal(b2.txn_root))
        );
        assert_eq!(entry.primaries, Some(PrimariesRef::Delta(1)));
    }

    #[test]
    fn untouched_ledger_root_becomes_accumulating_delta() {
        let fx = setup();
        order_batch(&fx, 1, &fx.domain, &["Alpha", "Beta"], 2);
        order_batch(&fx, 2, &fx.domain, &["Alpha", "Beta"], 1);

        // Pool batch with changed primaries: domain root one back.
        let b3 = order_batch(&fx, 3, &fx.pool, &["Beta", "Alpha"], 1);
        let entry3 = last_entry(&fx);
        assert_eq!(
            entry3.ledger_root.get(&LedgerId::POOL),
            Some(&RootRef::Literal(b3.txn_root))
        );
        assert_eq!(entry3.ledger_root.get(&LedgerId::DOMAIN), Some(&RootRef::Delta(1)));
        assert_eq!(
            entry3.primaries,
            Some(PrimariesRef::Literal(primaries(&["Beta", "Alpha"])))
        );

        // Another pool batch: the domain delta accumulates.
        order_batch(&fx, 4, &fx.pool, &["Beta", "Alpha"], 1);
        let entry4 = last_entry(&fx);
        assert_eq!(entry4.ledger_root.get(&LedgerId::DOMAIN), Some(&RootRef::Delta(2)));
        assert_eq!(entry4.primaries, Some(PrimariesRef::Delta(1)));
    }

    #[test]
    fn root_delta_round_trips_to_the_literal_root() {
        let fx = setup();
        order_batch(&fx, 1, &fx.domain, &["Alpha"], 2);
        let b2 = order_batch(&fx, 2, &fx.domain, &["Alpha"], 1);
        order_batch(&fx, 3, &fx.pool, &["Alpha"], 1);
        let b4 = order_batch(&fx, 4, &fx.pool, &["Alpha"], 1);

        // Walking the delta at entry 4 lands on the root recorded when
        // the domain ledger last actually changed (entry 2).
        assert_eq!(
            fx.handler.resolve_ledger_root(4, LedgerId::DOMAIN).unwrap(),
            Some(b2.txn_root)
        );
        assert_eq!(
            fx.handler.resolve_ledger_root(4, LedgerId::POOL).unwrap(),
            Some(b4.txn_root)
        );
        // At entry 1 the pool ledger had never been audited.
        assert_eq!(fx.handler.resolve_ledger_root(1, LedgerId::POOL).unwrap(), None);
    }

    #[test]
    fn primaries_round_trip_through_accumulated_deltas() {
        let fx = setup();
        order_batch(&fx, 1, &fx.domain, &["Alpha", "Beta"], 1);
        order_batch(&fx, 2, &fx.domain, &["Alpha", "Beta"], 1);
        order_batch(&fx, 3, &fx.domain, &["Alpha", "Beta"], 1);
        assert_eq!(last_entry(&fx).primaries, Some(PrimariesRef::Delta(2)));
        assert_eq!(
            fx.handler.resolve_primaries(3).unwrap(),
            primaries(&["Alpha", "Beta"])
        );

        order_batch(&fx, 4, &fx.domain, &["Gamma"], 1);
        assert_eq!(
            last_entry(&fx).primaries,
            Some(PrimariesRef::Literal(primaries(&["Gamma"])))
        );
        assert_eq!(fx.handler.resolve_primaries(4).unwrap(), primaries(&["Gamma"]));
    }

    #[test]
    fn legacy_batch_appends_nothing_but_stays_aligned() {
        let fx = setup();
        fx.domain.append(vec![LedgerTxn::raw(json!(1))]).unwrap();
        let batch = ThreePcBatch::new(
            0,
            1,
            LedgerId::DOMAIN,
            fx.domain.uncommitted_root_hash().unwrap(),
            RootHash::from_bytes([1; 32]),
            1_700_000_000,
            primaries(&["Alpha"]),
            false,
        );
        fx.handler.post_batch_applied(&batch, None).unwrap();
        assert_eq!(fx.audit.uncommitted_size().unwrap(), 0);

        // Commit of the legacy batch commits zero audit entries.
        let committed = fx.handler.commit_batch(&batch, None).unwrap();
        assert!(committed.is_empty());
        assert_eq!(fx.audit.size().unwrap(), 0);
    }

    #[test]
    fn reject_discards_exactly_the_newest_entry() {
        let fx = setup();
        order_batch(&fx, 1, &fx.domain, &["Alpha"], 1);
        let root_after_b1 = fx.audit.uncommitted_root_hash().unwrap();
        order_batch(&fx, 2, &fx.domain, &["Alpha"], 1);
        assert_eq!(fx.audit.uncommitted_size().unwrap(), 2);

        fx.handler.post_batch_rejected(LedgerId::DOMAIN, None).unwrap();
        assert_eq!(fx.audit.uncommitted_size().unwrap(), 1);
        assert_eq!(fx.audit.uncommitted_root_hash().unwrap(), root_after_b1);

        fx.handler.post_batch_rejected(LedgerId::DOMAIN, None).unwrap();
        assert_eq!(fx.audit.uncommitted_size().unwrap(), 0);
        let err = fx.handler.post_batch_rejected(LedgerId::DOMAIN, None).unwrap_err();
        assert_eq!(err, BatchError::Tracker(TrackerError::NothingPending));
    }

    #[test]
    fn commit_moves_the_oldest_entry_to_durable_storage() {
        let fx = setup();
        let b1 = order_batch(&fx, 1, &fx.domain, &["Alpha"], 1);
        order_batch(&fx, 2, &fx.domain, &["Alpha"], 1);

        let committed = fx.handler.commit_batch(&b1, None).unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].as_audit().unwrap().pp_seq_no, 1);
        assert_eq!(fx.audit.size().unwrap(), 1);
        assert_eq!(fx.audit.uncommitted_size().unwrap(), 2);
    }

    fn corrupt_entry(pp_seq_no: u64, primaries: Option<PrimariesRef>) -> LedgerTxn {
        LedgerTxn::audit(
            AuditTxn {
                version: AUDIT_TXN_VERSION.to_string(),
                view_no: 0,
                pp_seq_no,
                ledgers_size: Default::default(),
                ledger_root: Default::default(),
                state_root: Default::default(),
                primaries,
            },
            1_700_000_000,
        )
    }

    #[test]
    fn primaries_delta_past_the_ledger_is_fatal() {
        let fx = setup();
        fx.audit
            .append(vec![corrupt_entry(1, Some(PrimariesRef::Delta(1)))])
            .unwrap();
        fx.domain.append(vec![LedgerTxn::raw(json!(1))]).unwrap();
        let batch = ThreePcBatch::new(
            0,
            2,
            LedgerId::DOMAIN,
            fx.domain.uncommitted_root_hash().unwrap(),
            RootHash::from_bytes([2; 32]),
            1_700_000_000,
            primaries(&["Alpha"]),
            true,
        );
        let err = fx.handler.post_batch_applied(&batch, None).unwrap_err();
        assert!(matches!(err, BatchError::DeltaOutOfRange { delta: 1, .. }));
    }

    #[test]
    fn primaries_back_reference_to_a_delta_is_fatal() {
        let fx = setup();
        fx.audit
            .append(vec![
                corrupt_entry(1, Some(PrimariesRef::Delta(9))),
                corrupt_entry(2, Some(PrimariesRef::Delta(1))),
            ])
            .unwrap();
        fx.domain.append(vec![LedgerTxn::raw(json!(1))]).unwrap();
        let batch = ThreePcBatch::new(
            0,
            3,
            LedgerId::DOMAIN,
            fx.domain.uncommitted_root_hash().unwrap(),
            RootHash::from_bytes([3; 32]),
            1_700_000_000,
            primaries(&["Alpha"]),
            true,
        );
        let err = fx.handler.post_batch_applied(&batch, None).unwrap_err();
        assert!(matches!(err, BatchError::CorruptPrimaries { seq_no: 1, .. }));
    }

    #[test]
    fn missing_primaries_in_history_is_fatal() {
        let fx = setup();
        fx.audit.append(vec![corrupt_entry(1, None)]).unwrap();
        fx.domain.append(vec![LedgerTxn::raw(json!(1))]).unwrap();
        let batch = ThreePcBatch::new(
            0,
            2,
            LedgerId::DOMAIN,
            fx.domain.uncommitted_root_hash().unwrap(),
            RootHash::from_bytes([2; 32]),
            1_700_000_000,
            primaries(&["Alpha"]),
            true,
        );
        let err = fx.handler.post_batch_applied(&batch, None).unwrap_err();
        assert!(matches!(err, BatchError::MissingPrimaries { seq_no: 1, .. }));
    }

    #[test]
    fn delta_resolution_spans_the_uncommitted_boundary() {
        let fx = setup();
        let b1 = order_batch(&fx, 1, &fx.domain, &["Alpha"], 1);
        fx.handler.commit_batch(&b1, None).unwrap();

        // Entries 2 and 3 stay uncommitted; resolution still walks back
        // into committed history.
        order_batch(&fx, 2, &fx.pool, &["Alpha"], 1);
        order_batch(&fx, 3, &fx.pool, &["Alpha"], 1);
        assert_eq!(
            fx.handler.resolve_ledger_root(3, LedgerId::DOMAIN).unwrap(),
            Some(b1.txn_root)
        );
        assert_eq!(fx.handler.resolve_primaries(3).unwrap(), primaries(&["Alpha"]));
    }
}
