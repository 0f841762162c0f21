//! Venue access and trade execution for triangular arbitrage.
//!
//! This crate owns everything that talks to venues: the client trait and
//! its in-memory mock, rate limiting, balance tracking, the three-leg
//! execution orchestrator and the scanning loop that feeds it.

pub mod balance;
pub mod client;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod orchestrator;
pub mod order;
pub mod rate_limit;
pub mod route;
pub mod scanner;

pub use balance::*;
pub use client::*;
pub use error::*;
pub use gateway::*;
pub use mock::*;
pub use orchestrator::*;
pub use order::*;
pub use rate_limit::*;
pub use route::*;
pub use scanner::*;
