use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use plinth_types::LedgerId;

use crate::error::LedgerError;
use crate::traits::{Ledger, State};

/// A registered `(ledger, state)` pair.
#[derive(Clone)]
pub struct Database {
    pub ledger: Arc<dyn Ledger>,
    pub state: Arc<dyn State>,
}

/// Registry mapping a ledger id to its `(ledger, state)` pair.
///
/// The single source of truth for which ledgers exist. Populated once
/// at node bring-up (or during an explicit reconfiguration phase) and
/// treated as read-only by every consumer afterwards; registration is
/// not safe to interleave with reads. Lookup of an unregistered ledger
/// is a fatal logic error, not a user-recoverable one.
pub struct DatabaseManager {
    databases: RwLock<BTreeMap<LedgerId, Database>>,
}

impl DatabaseManager {
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a ledger and its state. Called once per ledger;
    /// re-registration is an error.
    pub fn register_new_database(
        &self,
        ledger_id: LedgerId,
        ledger: Arc<dyn Ledger>,
        state: Arc<dyn State>,
    ) -> Result<(), LedgerError> {
        let mut databases = self
            .databases
            .write()
            .map_err(|_| LedgerError::LockPoisoned("registry write lock poisoned".into()))?;
        if databases.contains_key(&ledger_id) {
            return Err(LedgerError::AlreadyRegistered(ledger_id));
        }
        databases.insert(ledger_id, Database { ledger, state });
        info!(ledger_id = %ledger_id, "registered ledger");
        Ok(())
    }

    pub fn get_database(&self, ledger_id: LedgerId) -> Result<Database, LedgerError> {
        self.databases
            .read()
            .map_err(|_| LedgerError::LockPoisoned("registry read lock poisoned".into()))?
            .get(&ledger_id)
            .cloned()
            .ok_or(LedgerError::UnregisteredLedger(ledger_id))
    }

    pub fn get_ledger(&self, ledger_id: LedgerId) -> Result<Arc<dyn Ledger>, LedgerError> {
        Ok(self.get_database(ledger_id)?.ledger)
    }

    pub fn get_state(&self, ledger_id: LedgerId) -> Result<Arc<dyn State>, LedgerError> {
        Ok(self.get_database(ledger_id)?.state)
    }

    /// All registered ledger ids in ascending order. Iteration order is
    /// deterministic so that audit entries are byte-for-byte comparable
    /// across nodes.
    pub fn ledger_ids(&self) -> Result<Vec<LedgerId>, LedgerError> {
        Ok(self
            .databases
            .read()
            .map_err(|_| LedgerError::LockPoisoned("registry read lock poisoned".into()))?
            .keys()
            .copied()
            .collect())
    }
}

impl Default for DatabaseManager {
    fn default() -> Self {
        Self::new()
    }
}
