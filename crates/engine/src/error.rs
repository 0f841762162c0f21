//! Error types for opportunity evaluation.

use thiserror::Error;

/// Errors raised while evaluating an opportunity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Insufficient depth on {symbol}: requested {requested}, filled {filled}")]
    InsufficientDepth {
        symbol: String,
        requested: f64,
        filled: f64,
    },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
