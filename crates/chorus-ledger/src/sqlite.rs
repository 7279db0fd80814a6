//! SQLite implementation of the Ledger trait.
//!
//! This is the primary ledger backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking. Only canonical bytes are
//! stored; payloads are decoded back to JSON on read.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use chorus_core::{canonical_bytes, declared_tag, decode_record, Blake3Hash, RecordId};

use crate::error::{LedgerError, Result};
use crate::migration;
use crate::traits::{CommitResult, Ledger, Transaction};

/// SQLite-based ledger implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| LedgerError::Unavailable(format!("mutex poisoned: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| LedgerError::Unavailable(format!("spawn_blocking failed: {e}")))?
    }
}

fn id_from_blob(blob: Vec<u8>) -> Result<RecordId> {
    RecordId::try_from(blob.as_slice())
        .map_err(|_| LedgerError::InvalidData(format!("record id of {} bytes", blob.len())))
}

/// Local commit time (Unix ms).
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn get_transaction(&self, id: &RecordId) -> Result<Option<Transaction>> {
        let id = *id;

        self.blocking(move |conn| {
            let canonical: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT canonical_bytes FROM transactions WHERE record_id = ?1",
                    params![id.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            match canonical {
                None => Ok(None),
                Some(canonical) => Ok(Some(Transaction {
                    id,
                    payload: decode_record(&canonical)?,
                })),
            }
        })
        .await
    }

    async fn commit(&self, record: &Value) -> Result<CommitResult> {
        let canonical = canonical_bytes(record)?;
        let id = RecordId(Blake3Hash::hash(&canonical).0);
        let record_type = declared_tag(record).map(str::to_owned);

        let result = self
            .blocking(move |conn| {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO transactions (
                        record_id, record_type, canonical_bytes, committed_at
                    ) VALUES (?1, ?2, ?3, ?4)",
                    params![id.0.as_slice(), record_type, canonical, now_millis()],
                )?;

                Ok(if inserted == 0 {
                    CommitResult::AlreadyExists(id)
                } else {
                    CommitResult::Committed(id)
                })
            })
            .await?;

        if matches!(result, CommitResult::Committed(_)) {
            tracing::debug!(%id, "record committed");
        }
        Ok(result)
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT record_id FROM transactions ORDER BY record_id")?;
            let blobs = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            blobs.into_iter().map(id_from_blob).collect()
        })
        .await
    }
}
