//! Surface-rate evaluation over top-of-book quotes.
//!
//! A triangle is walked from a notional amount of 1 in both directions.
//! Every leg is priced by the same rule: holding the symbol's quote
//! currency buys the base at `(1 / ask) * (1 - fee)`, holding the base
//! sells it at `bid * (1 - fee)`.

use crate::{EngineError, EngineResult, LegFees};
use tracing::debug;
use triarb_core::{
    Currency, Direction, Quote, QuoteSnapshot, SurfaceLeg, SurfaceOpportunity, Symbol, TradeSide,
    TriangularPair,
};

/// Fee-adjusted conversion rate for one leg.
///
/// A non-positive ask means no liquidity and yields 0.
#[inline]
pub fn conversion_rate(side: TradeSide, quote: &Quote, fee: f64) -> f64 {
    match side {
        TradeSide::Buy if quote.ask > 0.0 => (1.0 / quote.ask) * (1.0 - fee),
        TradeSide::Buy => 0.0,
        TradeSide::Sell => quote.bid * (1.0 - fee),
    }
}

/// Evaluates triangles against a quote snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceRateEngine {
    /// Minimum profit (percent) for a direction to be reported.
    min_profit_pct: f64,
}

impl SurfaceRateEngine {
    pub fn new(min_profit_pct: f64) -> Self {
        Self { min_profit_pct }
    }

    pub fn min_profit_pct(&self) -> f64 {
        self.min_profit_pct
    }

    /// Best direction whose profit exceeds the threshold, if any.
    ///
    /// A missing quote for any of the three symbols makes the pair
    /// unevaluable and returns `DataUnavailable`.
    pub fn evaluate<F: LegFees + ?Sized>(
        &self,
        pair: &TriangularPair,
        quotes: &QuoteSnapshot,
        fees: &F,
    ) -> EngineResult<Option<SurfaceOpportunity>> {
        let pair_quotes = pair_quotes(pair, quotes)?;

        let mut best: Option<SurfaceOpportunity> = None;
        for direction in [Direction::Forward, Direction::Reverse] {
            let Some(opp) = walk(pair, direction, &pair_quotes, fees) else {
                continue;
            };
            debug!(
                "{} {} {}: {:.6}%",
                pair,
                direction,
                opp.route(),
                opp.profit_loss_pct
            );
            if opp.profit_loss_pct <= self.min_profit_pct {
                continue;
            }
            // Ties keep the earlier (forward) direction
            if best
                .as_ref()
                .map_or(true, |b| opp.profit_loss_pct > b.profit_loss_pct)
            {
                best = Some(opp);
            }
        }

        Ok(best)
    }

    /// Evaluate one direction without applying the threshold.
    ///
    /// Returns `Ok(None)` when the direction has no path back to its
    /// starting currency.
    pub fn evaluate_direction<F: LegFees + ?Sized>(
        &self,
        pair: &TriangularPair,
        direction: Direction,
        quotes: &QuoteSnapshot,
        fees: &F,
    ) -> EngineResult<Option<SurfaceOpportunity>> {
        let pair_quotes = pair_quotes(pair, quotes)?;
        Ok(walk(pair, direction, &pair_quotes, fees))
    }
}

fn pair_quotes(pair: &TriangularPair, quotes: &QuoteSnapshot) -> EngineResult<[Quote; 3]> {
    let lookup = |symbol: &Symbol| {
        quotes
            .get(&symbol.id())
            .ok_or_else(|| EngineError::DataUnavailable(format!("no quote for {}", symbol)))
    };
    Ok([
        lookup(&pair.pair_a)?,
        lookup(&pair.pair_b)?,
        lookup(&pair.pair_c)?,
    ])
}

fn walk<F: LegFees + ?Sized>(
    pair: &TriangularPair,
    direction: Direction,
    pair_quotes: &[Quote; 3],
    fees: &F,
) -> Option<SurfaceOpportunity> {
    let symbols = pair.symbols();
    let start = match direction {
        Direction::Forward => pair.pair_a.base.clone(),
        Direction::Reverse => pair.pair_a.quote.clone(),
    };

    let ctx = LinkContext {
        symbols,
        quotes: pair_quotes,
        fees,
    };

    let (_, leg1) = ctx.link(0, &start, &[0])?;
    let (used, leg2) = ctx.link(1, &leg1.to, &[1, 2])?;
    let remaining = if used == 1 { 2 } else { 1 };
    let (_, leg3) = ctx.link(2, &leg2.to, &[remaining])?;
    if leg3.to != start {
        return None;
    }

    let mut amount = 1.0;
    let mut acquired = [0.0; 3];
    for (slot, leg) in acquired.iter_mut().zip([&leg1, &leg2, &leg3]) {
        amount *= leg.rate;
        *slot = amount;
    }
    let profit_loss = amount - 1.0;

    Some(SurfaceOpportunity {
        pair: pair.clone(),
        direction,
        legs: [leg1, leg2, leg3],
        starting_amount: 1.0,
        acquired,
        profit_loss,
        profit_loss_pct: profit_loss * 100.0,
    })
}

struct LinkContext<'a, F: ?Sized> {
    symbols: [&'a Symbol; 3],
    quotes: &'a [Quote; 3],
    fees: &'a F,
}

impl<F: LegFees + ?Sized> LinkContext<'_, F> {
    /// Convert `held` through the first candidate symbol that trades it.
    ///
    /// Returns the index of the symbol used along with the priced leg.
    fn link(&self, leg: usize, held: &Currency, candidates: &[usize]) -> Option<(usize, SurfaceLeg)> {
        candidates.iter().find_map(|&idx| {
            let symbol = self.symbols[idx];
            let side = TradeSide::to_convert(held, symbol)?;
            let to = symbol.counter(held)?.clone();
            let rate = conversion_rate(side, &self.quotes[idx], self.fees.leg_fee(leg, symbol));
            Some((
                idx,
                SurfaceLeg {
                    symbol: symbol.clone(),
                    side,
                    from: held.clone(),
                    to,
                    rate,
                },
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeeSchedule;
    use pretty_assertions::assert_eq;
    use triarb_core::Exchange;

    fn sym(id: &str) -> Symbol {
        Symbol::parse(id, Exchange::Kucoin).unwrap()
    }

    fn btc_eth_usdt() -> TriangularPair {
        TriangularPair::new(sym("BTC-USDT"), sym("ETH-USDT"), sym("ETH-BTC")).unwrap()
    }

    fn snapshot() -> QuoteSnapshot {
        QuoteSnapshot::from_quotes(
            Exchange::Kucoin,
            [
                ("BTC-USDT", 60_000.0, 60_010.0),
                ("ETH-USDT", 2_990.0, 3_000.0),
                ("ETH-BTC", 0.0505, 0.0506),
            ],
        )
    }

    #[test]
    fn test_conversion_rate() {
        let quote = Quote::new(99.0, 100.0);
        assert!((conversion_rate(TradeSide::Buy, &quote, 0.0) - 0.01).abs() < 1e-15);
        assert!((conversion_rate(TradeSide::Sell, &quote, 0.001) - 98.901).abs() < 1e-9);
        assert_eq!(conversion_rate(TradeSide::Buy, &Quote::new(99.0, 0.0), 0.001), 0.0);
    }

    #[test]
    fn test_forward_from_base_selected() {
        let engine = SurfaceRateEngine::new(0.0);
        let fees = FeeSchedule::flat(0.001);
        let opp = engine
            .evaluate(&btc_eth_usdt(), &snapshot(), &fees)
            .unwrap()
            .unwrap();

        assert_eq!(opp.direction, Direction::Forward);
        assert_eq!(opp.starting_currency().as_str(), "BTC");
        assert_eq!(opp.route(), "BTC -> USDT -> ETH -> BTC");
        let sides: Vec<TradeSide> = opp.legs.iter().map(|l| l.side).collect();
        assert_eq!(sides, vec![TradeSide::Sell, TradeSide::Buy, TradeSide::Sell]);

        let expected = 60_000.0 * 0.999 * (1.0 / 3_000.0) * 0.999 * 0.0505 * 0.999;
        assert!((opp.acquired[2] - expected).abs() < 1e-12);
        assert!((opp.profit_loss_pct - (expected - 1.0) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_reverse_walk() {
        let engine = SurfaceRateEngine::new(0.0);
        let opp = engine
            .evaluate_direction(&btc_eth_usdt(), Direction::Reverse, &snapshot(), &0.001)
            .unwrap()
            .unwrap();

        assert_eq!(opp.route(), "USDT -> BTC -> ETH -> USDT");
        let expected = (1.0 / 60_010.0) * 0.999 * (1.0 / 0.0506) * 0.999 * 2_990.0 * 0.999;
        assert!((opp.acquired[2] - expected).abs() < 1e-12);
        assert!(opp.profit_loss_pct < 0.0);
    }

    #[test]
    fn test_threshold_filters_everything() {
        let engine = SurfaceRateEngine::new(5.0);
        let result = engine.evaluate(&btc_eth_usdt(), &snapshot(), &0.001).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_missing_quote_is_data_unavailable() {
        let quotes = QuoteSnapshot::from_quotes(
            Exchange::Kucoin,
            [("BTC-USDT", 60_000.0, 60_010.0), ("ETH-USDT", 2_990.0, 3_000.0)],
        );
        let result = SurfaceRateEngine::new(0.0).evaluate(&btc_eth_usdt(), &quotes, &0.001);
        assert!(matches!(result, Err(EngineError::DataUnavailable(_))));
    }

    #[test]
    fn test_zero_ask_does_not_fault() {
        let quotes = QuoteSnapshot::from_quotes(
            Exchange::Kucoin,
            [
                ("BTC-USDT", 60_000.0, 60_010.0),
                ("ETH-USDT", 2_990.0, 0.0),
                ("ETH-BTC", 0.0505, 0.0506),
            ],
        );
        let opp = SurfaceRateEngine::new(-1000.0)
            .evaluate_direction(&btc_eth_usdt(), Direction::Forward, &quotes, &0.001)
            .unwrap()
            .unwrap();
        assert_eq!(opp.acquired[2], 0.0);
        assert_eq!(opp.profit_loss_pct, -100.0);
    }

    #[test]
    fn test_break_even_is_not_reported() {
        // Prices and fees chosen so forward compounds to exactly 1
        let quotes = QuoteSnapshot::from_quotes(
            Exchange::Kucoin,
            [
                ("BTC-USDT", 2.0, 2.0),
                ("ETH-USDT", 1.0, 1.0),
                ("ETH-BTC", 0.5, 0.5),
            ],
        );
        let engine = SurfaceRateEngine::new(0.0);
        let forward = engine
            .evaluate_direction(&btc_eth_usdt(), Direction::Forward, &quotes, &0.0)
            .unwrap()
            .unwrap();
        assert_eq!(forward.profit_loss, 0.0);
        assert!(engine.evaluate(&btc_eth_usdt(), &quotes, &0.0).unwrap().is_none());
    }
}
