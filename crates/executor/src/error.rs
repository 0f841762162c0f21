//! Error types for execution operations.

use std::time::Duration;
use thiserror::Error;
use triarb_core::Exchange;
use triarb_engine::EngineError;

/// Errors that can occur while scanning or executing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Insufficient depth on {symbol}: requested {requested}, filled {filled}")]
    InsufficientDepth {
        symbol: String,
        requested: f64,
        filled: f64,
    },

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Order {order_id} not filled within {timeout_ms} ms")]
    OrderTimedOut { order_id: String, timeout_ms: u64 },

    #[error("Rate limit exceeded on {venue}, retry after {retry_after:?}")]
    RateLimitExceeded { venue: Exchange, retry_after: Duration },

    #[error("No route for leg {leg} ({symbol})")]
    NoRoute { leg: usize, symbol: String },

    #[error("No client registered for {0}")]
    UnknownVenue(Exchange),

    #[error("Insufficient {currency} balance on {venue}")]
    InsufficientBalance { currency: String, venue: Exchange },

    #[error("Exchange error: {0}")]
    ExchangeError(String),
}

impl From<EngineError> for ExecutorError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::DataUnavailable(msg) => ExecutorError::DataUnavailable(msg),
            EngineError::InsufficientDepth {
                symbol,
                requested,
                filled,
            } => ExecutorError::InsufficientDepth {
                symbol,
                requested,
                filled,
            },
        }
    }
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
