//! Fault injection: ledgers that lie or fail, and weak key material.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;

use chorus_core::{Ed25519PublicKey, Ed25519Signature, RecordId};
use chorus_ledger::{CommitResult, Ledger, LedgerError, Result, Transaction};

/// Serves substituted payloads for chosen ids; everything else comes from
/// the inner ledger untouched.
pub struct TamperingLedger<L> {
    inner: L,
    forged: HashMap<RecordId, Value>,
}

impl<L: Ledger> TamperingLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            forged: HashMap::new(),
        }
    }

    /// Serve `payload` whenever `id` is looked up.
    pub fn forge(mut self, id: RecordId, payload: Value) -> Self {
        self.forged.insert(id, payload);
        self
    }
}

#[async_trait]
impl<L: Ledger> Ledger for TamperingLedger<L> {
    async fn get_transaction(&self, id: &RecordId) -> Result<Option<Transaction>> {
        match self.forged.get(id) {
            Some(payload) => Ok(Some(Transaction {
                id: *id,
                payload: payload.clone(),
            })),
            None => self.inner.get_transaction(id).await,
        }
    }

    async fn commit(&self, record: &Value) -> Result<CommitResult> {
        self.inner.commit(record).await
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>> {
        self.inner.list_ids().await
    }
}

/// Fails lookups with [`LedgerError::Unavailable`].
///
/// With no ids configured every lookup fails; otherwise only lookups of the
/// configured ids do.
pub struct FailingLedger<L> {
    inner: L,
    failing: HashSet<RecordId>,
}

impl<L: Ledger> FailingLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            failing: HashSet::new(),
        }
    }

    pub fn fail_on(mut self, id: RecordId) -> Self {
        self.failing.insert(id);
        self
    }

    fn check(&self, id: &RecordId) -> Result<()> {
        if self.failing.is_empty() || self.failing.contains(id) {
            Err(LedgerError::Unavailable(format!("injected fault for {id}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<L: Ledger> Ledger for FailingLedger<L> {
    async fn get_transaction(&self, id: &RecordId) -> Result<Option<Transaction>> {
        self.check(id)?;
        self.inner.get_transaction(id).await
    }

    async fn commit(&self, record: &Value) -> Result<CommitResult> {
        self.inner.commit(record).await
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>> {
        self.inner.list_ids().await
    }
}

/// The identity point as an Ed25519 public key.
///
/// A small-order key: under cofactorless verification the signature from
/// [`universal_signature`] verifies for every message.
pub fn small_order_key() -> Ed25519PublicKey {
    let mut bytes = [0u8; 32];
    bytes[0] = 1;
    Ed25519PublicKey::from_bytes(bytes)
}

/// `R` = identity, `s` = 0.
pub fn universal_signature() -> Ed25519Signature {
    let mut bytes = [0u8; 64];
    bytes[0] = 1;
    Ed25519Signature::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::content_address;
    use chorus_ledger::MemoryLedger;
    use serde_json::json;

    #[tokio::test]
    async fn test_tampering_serves_forged_payload() {
        let ledger = MemoryLedger::new();
        let honest = ledger.commit(&json!({"name": "honest"})).await.unwrap().id();
        let forged = json!({"name": "forged"});

        let ledger = TamperingLedger::new(ledger).forge(honest, forged.clone());
        let tx = ledger.get_transaction(&honest).await.unwrap().unwrap();

        assert_eq!(tx.id, honest);
        assert_eq!(tx.payload(), &forged);
        assert_ne!(content_address(tx.payload()).unwrap(), honest);
    }

    #[tokio::test]
    async fn test_failing_ledger_targets() {
        let ledger = MemoryLedger::new();
        let a = ledger.commit(&json!({"name": "a"})).await.unwrap().id();
        let b = ledger.commit(&json!({"name": "b"})).await.unwrap().id();

        let ledger = FailingLedger::new(ledger).fail_on(a);
        assert!(matches!(
            ledger.get_transaction(&a).await,
            Err(LedgerError::Unavailable(_))
        ));
        assert!(ledger.get_transaction(&b).await.unwrap().is_some());
    }

    #[test]
    fn test_universal_signature_verifies_anything() {
        let key = small_order_key();
        let sig = universal_signature();
        key.verify(b"one message", &sig).unwrap();
        key.verify(b"another message", &sig).unwrap();
    }
}
