//! # Chorus Testkit
//!
//! Testing utilities for Chorus.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a complete, valid rights graph committed to a memory ledger
//! - **Faults**: ledgers that serve forged payloads or fail, and weak key material
//! - **Generators**: Proptest strategies for property-based testing
//! - **Golden vectors**: records with their exact canonical bytes
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use chorus_testkit::fixtures::Catalog;
//!
//! async fn example() -> chorus_ledger::Result<()> {
//!     let catalog = Catalog::build().await?;
//!     let right = catalog.right_record().await?;
//!     # let _ = right;
//!     Ok(())
//! }
//! ```
//!
//! ## Golden Vectors
//!
//! ```rust
//! use chorus_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, canonical, _) in verify_all_vectors() {
//!     assert!(matches, "{name}: {canonical}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use chorus_core::content_address;
//! use chorus_testkit::generators::json_record;
//!
//! proptest! {
//!     #[test]
//!     fn content_address_is_deterministic(record in json_record()) {
//!         prop_assert_eq!(content_address(&record).unwrap(), content_address(&record).unwrap());
//!     }
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use faults::{small_order_key, universal_signature, FailingLedger, TamperingLedger};
pub use fixtures::Catalog;
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
