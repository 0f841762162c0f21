//! Triangular arbitrage detection engine.
//!
//! Pure computation only: triangle discovery over a symbol catalog,
//! fee-adjusted surface rates over top-of-book quotes, and depth-aware
//! refinement against order books. No I/O happens in this crate.

pub mod depth;
pub mod error;
pub mod fee;
pub mod surface;
pub mod triangle;

pub use depth::*;
pub use error::*;
pub use fee::*;
pub use surface::*;
pub use triangle::*;
