//! Core data types for the triangular arbitrage bot.

pub mod error;
pub mod exchange;
pub mod execution;
pub mod opportunity;
pub mod price;
pub mod symbol;
pub mod symbol_map;
pub mod triangle;

pub use error::*;
pub use exchange::*;
pub use execution::*;
pub use opportunity::*;
pub use price::*;
pub use symbol::*;
pub use symbol_map::*;
pub use triangle::*;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
