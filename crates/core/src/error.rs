//! Error types for core data parsing.

use thiserror::Error;

/// Errors raised while building core types from external input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("Invalid triangle: {0}")]
    InvalidTriangle(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
