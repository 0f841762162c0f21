//! Surface and depth-adjusted arbitrage opportunities.

use crate::{Currency, Exchange, Symbol, TriangularPair};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade side from the taker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    /// Side needed to convert `held` through `symbol`: holding the quote
    /// buys the base, holding the base sells it.
    pub fn to_convert(held: &str, symbol: &Symbol) -> Option<Self> {
        if symbol.quote == held {
            Some(TradeSide::Buy)
        } else if symbol.base == held {
            Some(TradeSide::Sell)
        } else {
            None
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traversal direction of a triangle.
///
/// Forward starts holding `pair_a.base`, reverse starts holding `pair_a.quote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One leg of a surface evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceLeg {
    pub symbol: Symbol,
    pub side: TradeSide,
    /// Currency spent on this leg.
    pub from: Currency,
    /// Currency received on this leg.
    pub to: Currency,
    /// Fee-adjusted conversion rate (units of `to` per unit of `from`).
    pub rate: f64,
}

/// Top-of-book evaluation of one triangle in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOpportunity {
    pub pair: TriangularPair,
    pub direction: Direction,
    pub legs: [SurfaceLeg; 3],
    pub starting_amount: f64,
    /// Amount held after each leg.
    pub acquired: [f64; 3],
    pub profit_loss: f64,
    pub profit_loss_pct: f64,
}

impl SurfaceOpportunity {
    pub fn starting_currency(&self) -> &Currency {
        &self.legs[0].from
    }

    /// Human-readable route, e.g. "BTC -> USDT -> ETH -> BTC".
    pub fn route(&self) -> String {
        let mut route = self.legs[0].from.to_string();
        for leg in &self.legs {
            route.push_str(" -> ");
            route.push_str(&leg.to);
        }
        route
    }
}

/// One leg after simulating fills against live order-book depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLeg {
    pub venue: Exchange,
    pub venue_symbol: String,
    pub side: TradeSide,
    /// Amount of the leg's input currency carried in.
    pub amount_in: f64,
    /// Base-asset quantity the leg tried to fill.
    pub target_quantity: f64,
    pub filled_quantity: f64,
    /// Volume-weighted price including slippage.
    pub effective_price: f64,
    /// Amount of the leg's output currency after fees.
    pub amount_out: f64,
}

/// A surface opportunity refined against order-book depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthAdjustedOpportunity {
    pub surface: SurfaceOpportunity,
    pub legs: [DepthLeg; 3],
    pub starting_amount: f64,
    pub final_amount: f64,
    pub real_profit_loss_pct: f64,
}

impl DepthAdjustedOpportunity {
    pub fn starting_currency(&self) -> &Currency {
        self.surface.starting_currency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_side_to_convert() {
        let symbol = Symbol::new("ETH", "BTC", Exchange::Kucoin);
        assert_eq!(TradeSide::to_convert("BTC", &symbol), Some(TradeSide::Buy));
        assert_eq!(TradeSide::to_convert("ETH", &symbol), Some(TradeSide::Sell));
        assert_eq!(TradeSide::to_convert("USDT", &symbol), None);
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Forward.to_string(), "forward");
        assert_eq!(Direction::Reverse.to_string(), "reverse");
    }
}
