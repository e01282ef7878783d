//! error types for audit operations.

use thiserror::Error;

/// errors that can occur during audit operations.
#[derive(Debug, Error)]
pub enum Error {
    /// a stored entry no longer matches the chain recomputed from genesis
    #[error("audit chain corrupted at sequence {sequence}")]
    ChainCorrupted { sequence: u64 },

    /// invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    /// invalid hex encoding
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// payload could not be canonically encoded
    #[error("encoding error: {0}")]
    Encoding(String),
}
