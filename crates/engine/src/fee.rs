//! Trading fee configuration for venues.
//!
//! Fees are taker rates expressed as fractions (0.001 = 0.1%). Every leg of
//! a triangle is a taker trade, so maker rates are not tracked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use triarb_core::{Exchange, Symbol};

/// Fee rate applied to one leg of a triangle.
///
/// The leg index (0..3) lets callers that route legs to different venues
/// charge the venue the leg will actually execute on.
pub trait LegFees {
    fn leg_fee(&self, leg: usize, symbol: &Symbol) -> f64;
}

/// A flat rate for every leg.
impl LegFees for f64 {
    fn leg_fee(&self, _leg: usize, _symbol: &Symbol) -> f64 {
        *self
    }
}

/// Per-venue taker fees with a fallback rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Rate used for venues without an explicit entry.
    pub default_fee: f64,
    pub venues: HashMap<Exchange, f64>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        let mut schedule = Self::flat(0.001);
        for &exchange in Exchange::all() {
            schedule
                .venues
                .insert(exchange, Self::default_for_exchange(exchange));
        }
        schedule
    }
}

impl FeeSchedule {
    /// Same rate everywhere.
    pub fn flat(fee: f64) -> Self {
        Self {
            default_fee: fee,
            venues: HashMap::new(),
        }
    }

    /// Published spot taker rate for an exchange.
    pub fn default_for_exchange(exchange: Exchange) -> f64 {
        match exchange {
            Exchange::Kucoin => 0.001,  // 0.1%
            Exchange::Binance => 0.001, // 0.1%
            Exchange::Okx => 0.001,     // 0.1%
        }
    }

    pub fn with_fee(mut self, exchange: Exchange, fee: f64) -> Self {
        self.set_fee(exchange, fee);
        self
    }

    pub fn set_fee(&mut self, exchange: Exchange, fee: f64) {
        self.venues.insert(exchange, fee);
    }

    pub fn fee_for(&self, exchange: Exchange) -> f64 {
        self.venues
            .get(&exchange)
            .copied()
            .unwrap_or(self.default_fee)
    }
}

impl LegFees for FeeSchedule {
    fn leg_fee(&self, _leg: usize, symbol: &Symbol) -> f64 {
        self.fee_for(symbol.venue)
    }
}
