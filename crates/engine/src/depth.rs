//! Order book depth walking.
//!
//! Surface rates only look at the best level. Before a candidate is
//! promoted to execution, each leg is re-priced by walking the live book
//! with a slippage allowance, and the triangle is re-compounded with the
//! resulting volume-weighted prices.

use crate::{EngineError, EngineResult, LegFees};
use tracing::debug;
use triarb_core::{
    DepthAdjustedOpportunity, DepthLeg, Exchange, OrderBook, SurfaceOpportunity, TradeSide,
};

/// Relative tolerance when deciding whether a fill reached its target.
const FILL_EPSILON: f64 = 1e-9;

/// Result of walking one side of a book.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FillEstimate {
    /// Base quantity that the book could absorb, never above the target.
    pub filled_quantity: f64,
    /// Volume-weighted price including slippage; 0 when nothing filled.
    pub effective_price: f64,
    /// Number of book levels touched.
    pub levels_consumed: usize,
}

impl FillEstimate {
    pub fn is_empty(&self) -> bool {
        self.filled_quantity <= 0.0
    }

    /// Whether the fill reached `target` within tolerance.
    pub fn is_complete(&self, target: f64) -> bool {
        self.filled_quantity >= target * (1.0 - FILL_EPSILON)
    }
}

/// Simulate a taker fill of `target_quantity` base units.
///
/// Buys consume asks, sells consume bids, best level first. Each level's
/// price is worsened by `slippage` (fraction) in the taker's disfavour.
/// An absent or empty book, or a non-positive target, fills nothing.
///
/// # Example
/// Asks `[(100, 1), (101, 2)]`, target 2, no slippage: filled 2 at 100.5.
pub fn simulate_fill(
    book: Option<&OrderBook>,
    side: TradeSide,
    target_quantity: f64,
    slippage: f64,
) -> FillEstimate {
    let Some(book) = book else {
        return FillEstimate::default();
    };
    if !target_quantity.is_finite() || target_quantity <= 0.0 {
        return FillEstimate::default();
    }

    let adjust = match side {
        TradeSide::Buy => 1.0 + slippage,
        TradeSide::Sell => 1.0 - slippage,
    };

    let mut filled = 0.0;
    let mut notional = 0.0;
    let mut levels_consumed = 0;

    for level in book.levels_for(side) {
        let remaining = target_quantity - filled;
        if remaining <= 0.0 {
            break;
        }
        let take = level.quantity.min(remaining);
        filled += take;
        notional += take * level.price * adjust;
        levels_consumed += 1;
    }

    if filled <= 0.0 {
        return FillEstimate::default();
    }

    FillEstimate {
        filled_quantity: filled,
        effective_price: notional / filled,
        levels_consumed,
    }
}

/// Order book for one leg, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LegBook {
    pub venue: Exchange,
    pub venue_symbol: String,
    /// `None` when the fetch failed.
    pub book: Option<OrderBook>,
}

impl LegBook {
    pub fn new(venue: Exchange, venue_symbol: impl Into<String>, book: Option<OrderBook>) -> Self {
        Self {
            venue,
            venue_symbol: venue_symbol.into(),
            book,
        }
    }
}

/// Base quantity a leg needs to fill when carrying `amount_in` of its input.
///
/// Sells spend the base directly. Buys spend quote, so the amount is
/// converted at the best ask.
pub fn base_target(side: TradeSide, amount_in: f64, book: &OrderBook) -> Option<f64> {
    match side {
        TradeSide::Sell => Some(amount_in),
        TradeSide::Buy => book
            .best_ask()
            .map(|level| amount_in / level.price),
    }
}

/// Amount of the leg's output currency after a fill, net of fees.
///
/// `amount_in` is what the leg actually spends, which may be less than the
/// simulated fill once the order size is rounded.
pub fn leg_output(side: TradeSide, amount_in: f64, fill: &FillEstimate, fee: f64) -> f64 {
    if fill.is_empty() || fill.effective_price <= 0.0 {
        return 0.0;
    }
    match side {
        TradeSide::Sell => amount_in * fill.effective_price * (1.0 - fee),
        TradeSide::Buy => amount_in / fill.effective_price * (1.0 - fee),
    }
}

/// Re-price a surface opportunity against live order books.
///
/// `books` are in leg order. Any leg that cannot fully absorb the amount
/// carried into it rejects the whole opportunity.
pub fn refine_with_depth<F: LegFees + ?Sized>(
    surface: &SurfaceOpportunity,
    books: &[LegBook; 3],
    starting_amount: f64,
    fees: &F,
    slippage: f64,
) -> EngineResult<DepthAdjustedOpportunity> {
    let mut amount = starting_amount;
    let mut legs: Vec<DepthLeg> = Vec::with_capacity(3);

    for (i, (surface_leg, leg_book)) in surface.legs.iter().zip(books).enumerate() {
        let book = leg_book
            .book
            .as_ref()
            .filter(|b| !b.levels_for(surface_leg.side).is_empty())
            .ok_or_else(|| {
                EngineError::DataUnavailable(format!(
                    "no {} book for {} on {}",
                    surface_leg.side, leg_book.venue_symbol, leg_book.venue
                ))
            })?;

        let target = base_target(surface_leg.side, amount, book).unwrap_or(0.0);
        let fill = simulate_fill(Some(book), surface_leg.side, target, slippage);
        if fill.is_empty() || !fill.is_complete(target) {
            return Err(EngineError::InsufficientDepth {
                symbol: leg_book.venue_symbol.clone(),
                requested: target,
                filled: fill.filled_quantity,
            });
        }

        let fee = fees.leg_fee(i, &surface_leg.symbol);
        let amount_out = leg_output(surface_leg.side, amount, &fill, fee);

        legs.push(DepthLeg {
            venue: leg_book.venue,
            venue_symbol: leg_book.venue_symbol.clone(),
            side: surface_leg.side,
            amount_in: amount,
            target_quantity: target,
            filled_quantity: fill.filled_quantity,
            effective_price: fill.effective_price,
            amount_out,
        });
        amount = amount_out;
    }

    let legs: [DepthLeg; 3] = legs
        .try_into()
        .map_err(|_| EngineError::DataUnavailable("expected three legs".to_string()))?;

    let real_profit_loss_pct = if starting_amount > 0.0 {
        (amount / starting_amount - 1.0) * 100.0
    } else {
        0.0
    };

    debug!(
        "Depth-adjusted {} {}: {:.6}% (surface {:.6}%)",
        surface.pair, surface.direction, real_profit_loss_pct, surface.profit_loss_pct
    );

    Ok(DepthAdjustedOpportunity {
        surface: surface.clone(),
        legs,
        starting_amount,
        final_amount: amount,
        real_profit_loss_pct,
    })
}
