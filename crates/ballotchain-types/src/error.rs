//! error types for ballotchain-types

use thiserror::Error;

/// errors that can occur while constructing core types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// address is empty, too long, or contains whitespace
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
