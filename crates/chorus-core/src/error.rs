//! Error types for Chorus Core.

use thiserror::Error;

/// Errors raised by encoding, decoding, and signature primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("floats are not allowed in canonical records: {0}")]
    FloatRejected(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("malformed identifier: {0}")]
    MalformedId(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}

impl From<hex::FromHexError> for CoreError {
    fn from(e: hex::FromHexError) -> Self {
        CoreError::MalformedId(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::MalformedRecord(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
