//! Venue client boundary.
//!
//! Credential handling, HTTP transport and SDK bindings live behind this
//! trait. Symbols passed in and out are venue-specific spellings.

use crate::ExecutorResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use triarb_core::{Currency, Exchange, OrderBook, Quote, TradeSide};

/// One market as listed by a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolListing {
    /// Venue-specific symbol name.
    pub name: String,
    pub base: Currency,
    pub quote: Currency,
    /// Smallest tradeable step of the base quantity, if the venue reports one.
    pub base_increment: Option<f64>,
}

/// Order parameters sent to a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub venue_symbol: String,
    pub side: TradeSide,
    /// Base quantity.
    pub size: f64,
    /// Limit price.
    pub price: f64,
    /// Protective stop price.
    pub stop_price: Option<f64>,
}

/// Order status as reported by a venue.
///
/// Anything other than open or filled is reported as `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueOrderStatus {
    Open,
    Filled,
    Closed,
}

/// Trait for venue API clients.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// The venue this client talks to.
    fn exchange(&self) -> Exchange;

    /// All tradeable spot markets.
    async fn list_symbols(&self) -> ExecutorResult<Vec<SymbolListing>>;

    /// Best bid/ask for every market, keyed by venue symbol.
    async fn fetch_quotes(&self) -> ExecutorResult<HashMap<String, Quote>>;

    /// Order book snapshot limited to `depth` levels per side.
    async fn fetch_order_book(&self, venue_symbol: &str, depth: usize) -> ExecutorResult<OrderBook>;

    /// Submit an order and return the venue order id.
    async fn submit_order(&self, request: &OrderRequest) -> ExecutorResult<String>;

    /// Get order status.
    async fn order_status(&self, venue_symbol: &str, order_id: &str)
        -> ExecutorResult<VenueOrderStatus>;

    /// Cancel an order.
    async fn cancel_order(&self, venue_symbol: &str, order_id: &str) -> ExecutorResult<()>;

    /// Available balances for the given currencies. Currencies the account
    /// does not hold are reported as zero.
    async fn balances(&self, currencies: &[Currency]) -> ExecutorResult<HashMap<Currency, f64>>;
}
