//! Error types for the finality watcher wire types.

use thiserror::Error;

/// Errors that can occur when parsing or validating wire types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Hex decoding failed
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Wrong number of bytes for a fixed-size identifier
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        actual: usize,
    },

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
