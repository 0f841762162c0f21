//! Leg routing across venues.
//!
//! Each leg position has an ordered list of candidate venues. A leg routes
//! to the first venue in its list that lists the leg's symbol in the
//! symbol map.

use crate::{ExecutorError, ExecutorResult};
use serde::{Deserialize, Serialize};
use triarb_core::{Exchange, Symbol, SymbolMap};
use triarb_engine::{FeeSchedule, LegFees};

/// Where one leg executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegRoute {
    pub venue: Exchange,
    pub venue_symbol: String,
}

/// Resolves legs to venues and prices them with the venue's fee.
#[derive(Debug, Clone)]
pub struct RoutePlanner {
    symbols: SymbolMap,
    leg_venues: [Vec<Exchange>; 3],
    fees: FeeSchedule,
}

impl RoutePlanner {
    pub fn new(symbols: SymbolMap, leg_venues: [Vec<Exchange>; 3], fees: FeeSchedule) -> Self {
        Self {
            symbols,
            leg_venues,
            fees,
        }
    }

    pub fn symbol_map(&self) -> &SymbolMap {
        &self.symbols
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub fn leg_venues(&self, leg: usize) -> &[Exchange] {
        self.leg_venues.get(leg).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every venue any leg may route to, deduplicated and sorted.
    pub fn all_venues(&self) -> Vec<Exchange> {
        let mut venues: Vec<Exchange> = self.leg_venues.iter().flatten().copied().collect();
        venues.sort();
        venues.dedup();
        venues
    }

    /// Route for leg `leg` (0-based) trading `symbol`.
    pub fn resolve(&self, leg: usize, symbol: &Symbol) -> ExecutorResult<LegRoute> {
        let canonical = symbol.id();
        self.leg_venues(leg)
            .iter()
            .find_map(|&venue| {
                self.symbols
                    .venue_symbol(&canonical, venue)
                    .map(|venue_symbol| LegRoute {
                        venue,
                        venue_symbol: venue_symbol.to_string(),
                    })
            })
            .ok_or(ExecutorError::NoRoute {
                leg: leg + 1,
                symbol: canonical,
            })
    }

    /// Routes for all three legs in order.
    pub fn resolve_all(&self, symbols: [&Symbol; 3]) -> ExecutorResult<[LegRoute; 3]> {
        Ok([
            self.resolve(0, symbols[0])?,
            self.resolve(1, symbols[1])?,
            self.resolve(2, symbols[2])?,
        ])
    }
}

/// Fee of the venue the leg routes to; unroutable legs fall back to the
/// symbol's own venue.
impl LegFees for RoutePlanner {
    fn leg_fee(&self, leg: usize, symbol: &Symbol) -> f64 {
        match self.resolve(leg, symbol) {
            Ok(route) => self.fees.fee_for(route.venue),
            Err(_) => self.fees.fee_for(symbol.venue),
        }
    }
}
