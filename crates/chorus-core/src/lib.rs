//! # Chorus Core
//!
//! Pure primitives for Chorus: record identifiers, canonical encoding,
//! signatures, record views, and the structural gate.
//!
//! This crate contains no I/O, no storage, no async. It is pure computation
//! over signed, content-addressed records.
//!
//! ## Key Types
//!
//! - [`RecordId`] - Content address of a record (Blake3 of its canonical bytes)
//! - [`RecordKind`] - The declared `@type` of a record
//! - [`ShapeKind`] - The shape a record is gated against
//! - [`SchemaGate`] - Default [`ShapeCheck`] backed by embedded JSON Schemas
//!
//! ## Canonicalization
//!
//! Records are hashed and signed over deterministic CBOR. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod record;
pub mod schema;
pub mod types;

pub use canonical::{canonical_bytes, content_address, decode_record};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CoreError, Result};
pub use record::{
    declared_kind, declared_tag, view, Agent, AgentBuilder, AgentKind, Album, AlbumBuilder, Link,
    Music, RecordKind, Right, RightBuilder, ShapeKind, Signature, SignatureBuilder, Track,
    TrackBuilder, CONTEXT,
};
pub use schema::{SchemaGate, ShapeCheck, ShapeError, Violation, Violations};
pub use types::RecordId;
