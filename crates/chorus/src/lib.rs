//! # Chorus
//!
//! Link validation for signed, content-addressed music-rights records.
//!
//! ## Overview
//!
//! Records (agents, albums, tracks, signatures, rights) live in a ledger
//! under the Blake3 hash of their canonical bytes, and link to one another by
//! that address. Before a right can be trusted, the whole graph under it has
//! to hold:
//!
//! - **Shape**: each record, and each record it links to, matches the shape
//!   its position requires (an album's publisher must be an organization)
//! - **Resolution**: every link resolves to a committed record
//! - **Signatures**: every signature verifies over the canonical bytes of the
//!   model it attests to, under the key the signer published
//! - **Attestation**: a right is signed by the artist of the music it covers
//!
//! [`LinkValidator`] walks that graph depth-first and stops at the first
//! failure, reported as a [`LinkError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chorus::{LinkValidator, ValidatorConfig};
//! use chorus::core::RecordId;
//! use chorus::ledger::SqliteLedger;
//!
//! async fn example(right: RecordId) -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = SqliteLedger::open("chorus.db")?;
//!     let validator = LinkValidator::new(ledger, ValidatorConfig::default())?;
//!
//!     let record = validator.validate_right_id(&right).await?;
//!     println!("valid right: {record}");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `chorus::core` - Records, canonical encoding, keys, and the schema gate
//! - `chorus::ledger` - Ledger abstraction and SQLite

pub mod error;
pub mod validator;

pub use error::{LinkError, Result};
pub use validator::{LinkValidator, ValidatorConfig};

pub use chorus_core as core;
pub use chorus_ledger as ledger;
