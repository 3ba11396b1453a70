use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid ledger id: {0}")]
    InvalidLedgerId(String),

    #[error("invalid delta value: {0}")]
    InvalidDelta(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
