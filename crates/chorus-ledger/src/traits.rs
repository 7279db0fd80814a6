//! Ledger trait: the abstract interface for record persistence.
//!
//! The validator only ever reads through this trait. Implementations include
//! SQLite (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use chorus_core::RecordId;

use crate::error::Result;

/// A committed record as served by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Content address the record was committed under.
    pub id: RecordId,
    /// The record itself.
    pub payload: Value,
}

impl Transaction {
    /// Borrow the record carried by this transaction.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Take the record out of the envelope.
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// Result of committing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    /// The record was new.
    Committed(RecordId),
    /// The record was already present (idempotent - not an error).
    AlreadyExists(RecordId),
}

impl CommitResult {
    /// The content address, whether or not this call wrote it.
    pub fn id(&self) -> RecordId {
        match self {
            Self::Committed(id) | Self::AlreadyExists(id) => *id,
        }
    }
}

/// The Ledger trait: async interface for content-addressed records.
///
/// All methods are async to support both blocking (SQLite) and async
/// backends. For SQLite, `spawn_blocking` is used internally so the runtime
/// is never blocked.
///
/// # Design Notes
///
/// - **Content addressing**: a record's id is Blake3 of its canonical bytes,
///   computed by the ledger on commit.
/// - **Immutability**: records are never updated or deleted.
/// - **Idempotent commits**: committing the same record twice returns
///   `AlreadyExists`.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Look up a transaction by the content address of its record.
    async fn get_transaction(&self, id: &RecordId) -> Result<Option<Transaction>>;

    /// Commit a record, returning its content address.
    async fn commit(&self, record: &Value) -> Result<CommitResult>;

    /// All content addresses in the ledger, in ascending byte order.
    async fn list_ids(&self) -> Result<Vec<RecordId>>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    async fn get_transaction(&self, id: &RecordId) -> Result<Option<Transaction>> {
        (**self).get_transaction(id).await
    }

    async fn commit(&self, record: &Value) -> Result<CommitResult> {
        (**self).commit(record).await
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>> {
        (**self).list_ids().await
    }
}
