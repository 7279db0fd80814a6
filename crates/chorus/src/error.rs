//! Error types for link validation.

use chorus_core::{CoreError, RecordId, ShapeError, ShapeKind};
use chorus_ledger::LedgerError;
use thiserror::Error;

/// Why a record or one of the records it links to failed validation.
///
/// Validation stops at the first failure; the variant describes that failure
/// and nothing else.
#[derive(Debug, Error)]
pub enum LinkError {
    /// A referenced record is not in the ledger.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The ledger failed while looking up a record.
    #[error("ledger lookup of {id} failed: {source}")]
    Ledger {
        id: RecordId,
        #[source]
        source: LedgerError,
    },

    /// A record does not have the shape its position requires.
    ///
    /// `at` is the content address of the offending record when it was
    /// reached through a link, `None` for a record handed in directly.
    #[error("invalid {kind} model{}", .at.as_ref().map(|id| format!(" at {id}")).unwrap_or_default())]
    InvalidModel {
        kind: ShapeKind,
        at: Option<RecordId>,
    },

    /// The record's `@type` is not one the dispatcher handles.
    #[error("unexpected record type {0:?}")]
    InvalidType(String),

    /// A signature does not verify over the canonical bytes of its model.
    #[error("signature does not verify over model {model}")]
    InvalidSignature { model: RecordId },

    /// The ledger served a record whose content hashes to a different id.
    #[error("ledger served content for {expected} that hashes to {actual}")]
    AddressMismatch {
        expected: RecordId,
        actual: RecordId,
    },

    /// A right embeds a signature over a model other than its music.
    #[error("right over {music} embeds a signature over {model}")]
    SignatureBindingMismatch { music: RecordId, model: RecordId },

    /// Links nest deeper than the configured limit.
    #[error("link depth exceeds limit of {limit}")]
    DepthExceeded { limit: usize },

    /// Canonical encoding failed, or a gated record could not be read.
    #[error("encoding error: {0}")]
    Encoding(#[from] CoreError),

    /// The structural gate itself failed (not a rejection).
    #[error("structural gate error: {0}")]
    Gate(ShapeError),
}

/// Result type for link validation.
pub type Result<T> = std::result::Result<T, LinkError>;
