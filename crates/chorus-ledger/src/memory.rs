//! In-memory implementation of the Ledger trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;

use chorus_core::{canonical_bytes, Blake3Hash, RecordId};

use crate::error::{LedgerError, Result};
use crate::traits::{CommitResult, Ledger, Transaction};

/// In-memory ledger implementation.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<BTreeMap<RecordId, Transaction>>,
}

impl MemoryLedger {
    /// Create a new empty in-memory ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<RecordId, Transaction>>> {
        self.inner
            .read()
            .map_err(|e| LedgerError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<RecordId, Transaction>>> {
        self.inner
            .write()
            .map_err(|e| LedgerError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_transaction(&self, id: &RecordId) -> Result<Option<Transaction>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn commit(&self, record: &Value) -> Result<CommitResult> {
        let canonical = canonical_bytes(record)?;
        let id = RecordId(Blake3Hash::hash(&canonical).0);

        let mut inner = self.write()?;
        if inner.contains_key(&id) {
            return Ok(CommitResult::AlreadyExists(id));
        }

        inner.insert(
            id,
            Transaction {
                id,
                payload: record.clone(),
            },
        );
        tracing::debug!(%id, "record committed");
        Ok(CommitResult::Committed(id))
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>> {
        Ok(self.read()?.keys().copied().collect())
    }
}
