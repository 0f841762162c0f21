//! Three-leg execution.
//!
//! Legs run strictly in order and the sequence only advances from a filled
//! leg. A failure halts the sequence; legs already filled stay filled and
//! are reported as partial exposure. Nothing is unwound.

use crate::{
    BalanceSnapshot, BalanceTracker, ExecutorError, ExecutorResult, LegRoute, Order,
    OrderRequest, RoutePlanner, VenueGateway, VenueOrderStatus,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info, warn};
use triarb_core::{Currency, DepthAdjustedOpportunity, Exchange, QuoteSnapshot, SurfaceLeg, TradeSide};
use triarb_engine::{base_target, leg_output, simulate_fill, FillEstimate};

/// Execution tunables.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Cap on the first leg, in `reference_currency`.
    pub max_trade_size: f64,
    pub reference_currency: Currency,
    pub order_book_depth: usize,
    /// Fractional price allowance when walking books.
    pub slippage_tolerance: f64,
    /// Fractional offset of the protective stop from the limit price.
    pub stop_loss_pct: f64,
    pub order_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause after a fill before balances are re-read.
    pub settle_delay: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_trade_size: 0.001,
            reference_currency: Currency::from("BTC"),
            order_book_depth: 50,
            slippage_tolerance: 0.001,
            stop_loss_pct: 0.005,
            order_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// A filled leg.
#[derive(Debug, Clone)]
pub struct LegReport {
    /// 1-based leg number.
    pub leg: usize,
    pub venue: Exchange,
    pub venue_symbol: String,
    pub side: TradeSide,
    pub input: Currency,
    pub output: Currency,
    pub order: Order,
    pub estimate: FillEstimate,
    /// Output currency amount expected from the fill, net of fees.
    pub expected_output: f64,
}

/// How an execution sequence ended.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// All three legs filled.
    Completed { legs: Vec<LegReport> },
    /// Nothing filled; no position changed.
    Aborted { leg: usize, reason: ExecutorError },
    /// Some legs filled before `failed_leg` failed.
    PartialExposure {
        filled: Vec<LegReport>,
        failed_leg: usize,
        reason: ExecutorError,
    },
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed { .. })
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, ExecutionOutcome::PartialExposure { .. })
    }

    pub fn filled_legs(&self) -> &[LegReport] {
        match self {
            ExecutionOutcome::Completed { legs } => legs,
            ExecutionOutcome::PartialExposure { filled, .. } => filled,
            ExecutionOutcome::Aborted { .. } => &[],
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Completed { legs } => {
                write!(f, "completed")?;
                if let Some(last) = legs.last() {
                    write!(f, ", received {:.8} {}", last.expected_output, last.output)?;
                }
                Ok(())
            }
            ExecutionOutcome::Aborted { leg, reason } => {
                write!(f, "aborted at leg {}: {}", leg, reason)
            }
            ExecutionOutcome::PartialExposure {
                filled,
                failed_leg,
                reason,
            } => write!(
                f,
                "partial exposure: {} leg(s) filled, leg {} failed: {}",
                filled.len(),
                failed_leg,
                reason
            ),
        }
    }
}

/// Runs confirmed opportunities leg by leg.
pub struct ExecutionOrchestrator {
    gateway: Arc<VenueGateway>,
    routes: Arc<RoutePlanner>,
    balances: Arc<BalanceTracker>,
    config: ExecutionConfig,
}

impl ExecutionOrchestrator {
    pub fn new(
        gateway: Arc<VenueGateway>,
        routes: Arc<RoutePlanner>,
        balances: Arc<BalanceTracker>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            gateway,
            routes,
            balances,
            config,
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn balances(&self) -> &Arc<BalanceTracker> {
        &self.balances
    }

    /// Read balances from every venue a leg may route to.
    pub async fn sync_balances(&self) -> Arc<BalanceSnapshot> {
        let venues: Vec<Exchange> = self
            .routes
            .all_venues()
            .into_iter()
            .filter(|v| self.gateway.has_venue(*v))
            .collect();
        self.balances.refresh(&self.gateway, &venues).await
    }

    /// Execute the three legs of `opp` in order.
    ///
    /// `quotes` is the snapshot the opportunity was found in; it sizes the
    /// first leg.
    pub async fn execute(&self, opp: &DepthAdjustedOpportunity, quotes: &QuoteSnapshot) -> ExecutionOutcome {
        info!(
            "Executing {} {} ({:.4}% expected)",
            opp.surface.pair,
            opp.surface.route(),
            opp.real_profit_loss_pct
        );

        let mut filled: Vec<LegReport> = Vec::with_capacity(3);
        let mut submitted_any = false;
        let mut carry: Option<f64> = None;

        for (i, leg) in opp.surface.legs.iter().enumerate() {
            match self.run_leg(i, leg, carry, quotes, &mut submitted_any).await {
                Ok(report) => {
                    carry = Some(report.expected_output);
                    filled.push(report);
                }
                Err(reason) => {
                    if submitted_any {
                        let mut venues: Vec<Exchange> = opp.legs.iter().map(|l| l.venue).collect();
                        venues.sort();
                        venues.dedup();
                        self.balances.refresh(&self.gateway, &venues).await;
                    }

                    let outcome = if filled.is_empty() {
                        warn!("Execution aborted at leg {}: {}", i + 1, reason);
                        ExecutionOutcome::Aborted { leg: i + 1, reason }
                    } else {
                        error!(
                            "PARTIAL EXPOSURE: {} leg(s) filled, leg {} failed: {}",
                            filled.len(),
                            i + 1,
                            reason
                        );
                        ExecutionOutcome::PartialExposure {
                            filled,
                            failed_leg: i + 1,
                            reason,
                        }
                    };
                    self.balances.log_snapshot("Balances after execution").await;
                    return outcome;
                }
            }
        }

        let outcome = ExecutionOutcome::Completed { legs: filled };
        info!("Execution {}", outcome);
        self.balances.log_snapshot("Balances after execution").await;
        outcome
    }

    async fn run_leg(
        &self,
        index: usize,
        leg: &SurfaceLeg,
        carry: Option<f64>,
        quotes: &QuoteSnapshot,
        submitted_any: &mut bool,
    ) -> ExecutorResult<LegReport> {
        let LegRoute {
            venue,
            venue_symbol,
        } = self.routes.resolve(index, &leg.symbol)?;

        let amount_in = self.leg_amount(index, leg, venue, carry, quotes).await?;

        let book = self
            .gateway
            .fetch_order_book(venue, &venue_symbol, self.config.order_book_depth)
            .await
            .map_err(|e| {
                ExecutorError::DataUnavailable(format!("{} book on {}: {}", venue_symbol, venue, e))
            })?;

        let target = base_target(leg.side, amount_in, &book).unwrap_or(0.0);
        let estimate = simulate_fill(Some(&book), leg.side, target, self.config.slippage_tolerance);
        if estimate.is_empty() {
            return Err(ExecutorError::InsufficientDepth {
                symbol: venue_symbol,
                requested: target,
                filled: 0.0,
            });
        }
        if !estimate.is_complete(target) {
            warn!(
                venue = %venue,
                symbol = %venue_symbol,
                leg = index + 1,
                "Partial depth: {} of {} fillable, leg resized",
                estimate.filled_quantity,
                target
            );
        }

        // Never ask for more than the book can absorb
        let raw_size = match leg.side {
            TradeSide::Sell => estimate.filled_quantity,
            TradeSide::Buy => (amount_in / estimate.effective_price).min(estimate.filled_quantity),
        };
        let size = self.gateway.round_size(venue, &venue_symbol, raw_size);
        if size <= 0.0 {
            return Err(ExecutorError::InsufficientBalance {
                currency: leg.from.to_string(),
                venue,
            });
        }

        let price = estimate.effective_price;
        let stop_price = match leg.side {
            TradeSide::Buy => price * (1.0 - self.config.stop_loss_pct),
            TradeSide::Sell => price * (1.0 + self.config.stop_loss_pct),
        };
        let request = OrderRequest {
            venue_symbol: venue_symbol.clone(),
            side: leg.side,
            size,
            price,
            stop_price: Some(stop_price),
        };

        let order_id = self
            .gateway
            .submit_order(venue, &request)
            .await
            .map_err(|e| match e {
                ExecutorError::OrderRejected(_) => e,
                other => ExecutorError::OrderRejected(other.to_string()),
            })?;
        *submitted_any = true;

        info!(
            venue = %venue,
            symbol = %venue_symbol,
            leg = index + 1,
            "Order submitted: {} {} @ {:.8} (stop {:.8}) id={}",
            leg.side,
            size,
            price,
            stop_price,
            order_id
        );

        let mut order = Order::submitted(
            venue,
            &venue_symbol,
            leg.side,
            size,
            price,
            Some(stop_price),
            order_id,
        );
        self.supervise(&mut order).await?;

        sleep(self.config.settle_delay).await;
        self.balances.refresh(&self.gateway, &[venue]).await;

        let spent = match leg.side {
            TradeSide::Sell => size,
            TradeSide::Buy => size * price,
        };
        let fee = self.routes.fees().fee_for(venue);
        let expected_output = leg_output(leg.side, spent, &estimate, fee);

        Ok(LegReport {
            leg: index + 1,
            venue,
            venue_symbol,
            side: leg.side,
            input: leg.from.clone(),
            output: leg.to.clone(),
            order,
            estimate,
            expected_output,
        })
    }

    /// Amount of the leg's input currency to commit.
    async fn leg_amount(
        &self,
        index: usize,
        leg: &SurfaceLeg,
        venue: Exchange,
        carry: Option<f64>,
        quotes: &QuoteSnapshot,
    ) -> ExecutorResult<f64> {
        let available = self.balances.snapshot().await.available(venue, &leg.from);

        let cap = match carry {
            Some(previous_output) if index > 0 => previous_output,
            _ => quotes
                .convert(self.config.max_trade_size, &self.config.reference_currency, &leg.from)
                .ok_or_else(|| {
                    ExecutorError::DataUnavailable(format!(
                        "cannot convert {} to {}",
                        self.config.reference_currency, leg.from
                    ))
                })?,
        };

        let amount = available.min(cap);
        debug!(
            "[{}] Leg {} sizing: available {} {}, cap {}",
            venue,
            index + 1,
            available,
            leg.from,
            cap
        );
        if amount <= 0.0 {
            return Err(ExecutorError::InsufficientBalance {
                currency: leg.from.to_string(),
                venue,
            });
        }
        Ok(amount)
    }

    /// Poll until the order fills, closes, or the deadline passes.
    async fn supervise(&self, order: &mut Order) -> ExecutorResult<()> {
        let deadline = Instant::now() + self.config.order_timeout;

        loop {
            match self
                .gateway
                .order_status(order.venue, &order.venue_symbol, &order.order_id)
                .await
            {
                Ok(VenueOrderStatus::Filled) => {
                    order.fill();
                    info!(
                        "[{}] Order {} filled: {} {}",
                        order.venue, order.order_id, order.side, order.venue_symbol
                    );
                    return Ok(());
                }
                Ok(VenueOrderStatus::Closed) => {
                    order.fail("closed without fill");
                    warn!("[{}] Order {} closed without fill", order.venue, order.order_id);
                    return Err(ExecutorError::OrderRejected(format!(
                        "order {} closed without fill",
                        order.order_id
                    )));
                }
                Ok(VenueOrderStatus::Open) => {}
                Err(e) => warn!("[{}] Status poll for {} failed: {}", order.venue, order.order_id, e),
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep_until((now + self.config.poll_interval).min(deadline)).await;
        }

        order.time_out();
        warn!(
            "[{}] Order {} timed out after {:?}, cancelling",
            order.venue, order.order_id, self.config.order_timeout
        );
        match self
            .gateway
            .cancel_order(order.venue, &order.venue_symbol, &order.order_id)
            .await
        {
            Ok(()) => {
                order.cancel();
                info!("[{}] Order {} canceled", order.venue, order.order_id);
            }
            Err(e) => {
                order.fail(&format!("cancel failed: {}", e));
                error!("[{}] Cancel of {} failed: {}", order.venue, order.order_id, e);
            }
        }

        Err(ExecutorError::OrderTimedOut {
            order_id: order.order_id.clone(),
            timeout_ms: self.config.order_timeout.as_millis() as u64,
        })
    }
}
