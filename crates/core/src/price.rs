//! Top-of-book quotes and order book snapshots.

use crate::{now_ms, Exchange, TradeSide};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Best bid/ask for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn new(bid: f64, ask: f64) -> Self {
        Self { bid, ask }
    }

    /// Both sides present, positive and finite.
    pub fn is_valid(&self) -> bool {
        self.bid.is_finite() && self.ask.is_finite() && self.bid > 0.0 && self.ask > 0.0
    }

    pub fn mid(&self) -> Option<f64> {
        self.is_valid().then(|| (self.bid + self.ask) / 2.0)
    }
}

/// Point-in-time quotes for every symbol of a venue, keyed by canonical id.
///
/// A snapshot is replaced wholesale on each scan tick and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSnapshot {
    venue: Option<Exchange>,
    quotes: HashMap<String, Quote>,
    timestamp_ms: u64,
}

impl QuoteSnapshot {
    pub fn new(venue: Exchange, quotes: HashMap<String, Quote>) -> Self {
        Self {
            venue: Some(venue),
            quotes,
            timestamp_ms: now_ms(),
        }
    }

    /// Build from (canonical id, bid, ask) tuples. Mainly for tests and simulation.
    pub fn from_quotes<'a, I>(venue: Exchange, quotes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64, f64)>,
    {
        let quotes = quotes
            .into_iter()
            .map(|(id, bid, ask)| (id.to_string(), Quote::new(bid, ask)))
            .collect();
        Self::new(venue, quotes)
    }

    pub fn venue(&self) -> Option<Exchange> {
        self.venue
    }

    pub fn get(&self, symbol_id: &str) -> Option<Quote> {
        self.quotes.get(symbol_id).copied()
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Convert an amount between two currencies through a direct or inverse
    /// market, at mid price.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(amount);
        }
        if let Some(mid) = self.get(&format!("{from}-{to}")).and_then(|q| q.mid()) {
            return Some(amount * mid);
        }
        self.get(&format!("{to}-{from}"))
            .and_then(|q| q.mid())
            .map(|mid| amount / mid)
    }
}

/// One price level of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

impl PriceLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }

    fn is_usable(&self) -> bool {
        self.price.is_finite() && self.quantity.is_finite() && self.price > 0.0 && self.quantity > 0.0
    }
}

/// Order book snapshot.
///
/// Bids are sorted descending by price (best bid first), asks ascending
/// (best ask first). Levels with non-positive price or quantity are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub timestamp_ms: u64,
}

impl OrderBook {
    pub fn new(mut bids: Vec<PriceLevel>, mut asks: Vec<PriceLevel>) -> Self {
        bids.retain(PriceLevel::is_usable);
        asks.retain(PriceLevel::is_usable);
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));
        Self {
            bids,
            asks,
            timestamp_ms: now_ms(),
        }
    }

    /// Build from (price, quantity) tuples.
    pub fn from_levels(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> Self {
        let to_levels = |levels: &[(f64, f64)]| {
            levels
                .iter()
                .map(|&(price, quantity)| PriceLevel::new(price, quantity))
                .collect()
        };
        Self::new(to_levels(bids), to_levels(asks))
    }

    /// Keep only the best `depth` levels per side.
    pub fn truncated(mut self, depth: usize) -> Self {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
        self
    }

    /// The side a taker consumes: asks for a buy, bids for a sell.
    pub fn levels_for(&self, side: TradeSide) -> &[PriceLevel] {
        match side {
            TradeSide::Buy => &self.asks,
            TradeSide::Sell => &self.bids,
        }
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Sum of quantities on the side consumed by `side`.
    pub fn total_depth(&self, side: TradeSide) -> f64 {
        self.levels_for(side).iter().map(|l| l.quantity).sum()
    }
}
