//! # Chorus Ledger
//!
//! Ledger abstraction for Chorus. Provides a trait-based interface for
//! content-addressed record persistence with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`Ledger`] - The async trait for all ledger operations
//! - [`SqliteLedger`] - SQLite-based persistent ledger
//! - [`MemoryLedger`] - In-memory ledger for tests
//! - [`Transaction`] - A committed record and its content address
//! - [`CommitResult`] - Result of committing a record
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chorus_ledger::{Ledger, SqliteLedger};
//! use serde_json::json;
//!
//! async fn example() -> chorus_ledger::Result<()> {
//!     let ledger = SqliteLedger::open("chorus.db")?;
//!
//!     let id = ledger.commit(&json!({"@type": "Organization", "name": "Blue Note"})).await?.id();
//!     let record = ledger.get_transaction(&id).await?.map(|tx| tx.into_payload());
//!     # let _ = record;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Content addressing**: the ledger derives every id from canonical bytes
//! - **Idempotent commits**: committing the same record twice returns `AlreadyExists`
//! - **Append-only**: no update or delete operations exist

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{CommitResult, Ledger, Transaction};
