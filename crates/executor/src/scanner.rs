//! Opportunity scanning loop.
//!
//! Each tick pulls a fresh quote snapshot from the reference venue, walks
//! every triangle in discovery order, and confirms the first surface
//! candidate against live order books. A confirmed candidate is either
//! executed inline or only reported, depending on the execution mode.

use crate::{
    ExecutionOrchestrator, ExecutionOutcome, ExecutorError, ExecutorResult, LegRoute,
    RoutePlanner, VenueGateway,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use triarb_core::{
    Currency, DepthAdjustedOpportunity, Exchange, ExecutionMode, QuoteSnapshot, SurfaceOpportunity,
    TriangularPair,
};
use triarb_engine::{refine_with_depth, LegBook, SurfaceRateEngine};

/// Scanner tunables.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Venue whose quotes drive surface evaluation.
    pub reference_venue: Exchange,
    pub min_surface_profit_pct: f64,
    pub min_real_profit_pct: f64,
    pub scan_interval: Duration,
    pub order_book_depth: usize,
    pub slippage_tolerance: f64,
    /// Amount walked through the books to confirm depth, in `reference_currency`.
    pub max_trade_size: f64,
    pub reference_currency: Currency,
    pub mode: ExecutionMode,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            reference_venue: Exchange::Kucoin,
            min_surface_profit_pct: 0.003,
            min_real_profit_pct: 0.003,
            scan_interval: Duration::from_millis(100),
            order_book_depth: 50,
            slippage_tolerance: 0.001,
            max_trade_size: 0.001,
            reference_currency: Currency::from("BTC"),
            mode: ExecutionMode::AlertOnly,
            max_ticks: None,
        }
    }
}

/// Scanner counters.
#[derive(Debug, Default)]
pub struct ScannerStats {
    pub ticks: AtomicU64,
    pub surface_candidates: AtomicU64,
    pub confirmed: AtomicU64,
    pub executions: AtomicU64,
    pub completed: AtomicU64,
    pub partial_exposures: AtomicU64,
    pub data_unavailable: AtomicU64,
}

impl ScannerStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScannerStatsSnapshot {
        ScannerStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            surface_candidates: self.surface_candidates.load(Ordering::Relaxed),
            confirmed: self.confirmed.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            partial_exposures: self.partial_exposures.load(Ordering::Relaxed),
            data_unavailable: self.data_unavailable.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ScannerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScannerStatsSnapshot {
    pub ticks: u64,
    pub surface_candidates: u64,
    pub confirmed: u64,
    pub executions: u64,
    pub completed: u64,
    pub partial_exposures: u64,
    pub data_unavailable: u64,
}

impl fmt::Display for ScannerStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks={} surface={} confirmed={} executions={} completed={} partial={} data_unavailable={}",
            self.ticks,
            self.surface_candidates,
            self.confirmed,
            self.executions,
            self.completed,
            self.partial_exposures,
            self.data_unavailable
        )
    }
}

/// Polls quotes, evaluates triangles and hands confirmed candidates on.
pub struct OpportunityScanner {
    config: ScannerConfig,
    gateway: Arc<VenueGateway>,
    routes: Arc<RoutePlanner>,
    orchestrator: Arc<ExecutionOrchestrator>,
    triangles: Vec<TriangularPair>,
    engine: SurfaceRateEngine,
    stats: Arc<ScannerStats>,
}

impl OpportunityScanner {
    pub fn new(
        config: ScannerConfig,
        gateway: Arc<VenueGateway>,
        routes: Arc<RoutePlanner>,
        orchestrator: Arc<ExecutionOrchestrator>,
        triangles: Vec<TriangularPair>,
    ) -> Self {
        let engine = SurfaceRateEngine::new(config.min_surface_profit_pct);
        Self {
            config,
            gateway,
            routes,
            orchestrator,
            triangles,
            engine,
            stats: Arc::new(ScannerStats::default()),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn triangles(&self) -> &[TriangularPair] {
        &self.triangles
    }

    pub fn stats(&self) -> Arc<ScannerStats> {
        self.stats.clone()
    }

    /// Fresh quotes from the reference venue, keyed by canonical id.
    ///
    /// Venue symbols missing from the symbol map are ignored.
    pub async fn fetch_snapshot(&self) -> ExecutorResult<QuoteSnapshot> {
        let venue = self.config.reference_venue;
        let raw = self
            .gateway
            .fetch_quotes(venue)
            .await
            .map_err(|e| ExecutorError::DataUnavailable(format!("quotes from {}: {}", venue, e)))?;

        let symbols = self.routes.symbol_map();
        let quotes: HashMap<String, _> = raw
            .into_iter()
            .filter_map(|(venue_symbol, quote)| {
                symbols
                    .canonical_for(venue, &venue_symbol)
                    .map(|canonical| (canonical.to_string(), quote))
            })
            .collect();

        if quotes.is_empty() {
            return Err(ExecutorError::DataUnavailable(format!(
                "no mapped quotes from {}",
                venue
            )));
        }
        Ok(QuoteSnapshot::new(venue, quotes))
    }

    /// Re-price a surface candidate against the books of the venues its
    /// legs route to. The three books are fetched concurrently.
    pub async fn confirm(
        &self,
        surface: &SurfaceOpportunity,
        quotes: &QuoteSnapshot,
    ) -> ExecutorResult<DepthAdjustedOpportunity> {
        let [r1, r2, r3] = self.routes.resolve_all([
            &surface.legs[0].symbol,
            &surface.legs[1].symbol,
            &surface.legs[2].symbol,
        ])?;

        let depth = self.config.order_book_depth;
        let (b1, b2, b3) = tokio::join!(
            self.gateway.fetch_order_book(r1.venue, &r1.venue_symbol, depth),
            self.gateway.fetch_order_book(r2.venue, &r2.venue_symbol, depth),
            self.gateway.fetch_order_book(r3.venue, &r3.venue_symbol, depth),
        );

        let leg_book = |route: LegRoute, book: ExecutorResult<_>| {
            let book = match book {
                Ok(book) => Some(book),
                Err(e) => {
                    debug!("[{}] Book fetch for {} failed: {}", route.venue, route.venue_symbol, e);
                    None
                }
            };
            LegBook::new(route.venue, route.venue_symbol, book)
        };
        let books = [leg_book(r1, b1), leg_book(r2, b2), leg_book(r3, b3)];

        let starting_amount = quotes
            .convert(
                self.config.max_trade_size,
                &self.config.reference_currency,
                surface.starting_currency(),
            )
            .ok_or_else(|| {
                ExecutorError::DataUnavailable(format!(
                    "cannot convert {} to {}",
                    self.config.reference_currency,
                    surface.starting_currency()
                ))
            })?;

        Ok(refine_with_depth(
            surface,
            &books,
            starting_amount,
            self.routes.as_ref(),
            self.config.slippage_tolerance,
        )?)
    }

    /// One pass over all triangles. Returns the first depth-confirmed
    /// candidate together with the snapshot it was found in.
    pub async fn scan_once(&self) -> ExecutorResult<Option<(DepthAdjustedOpportunity, QuoteSnapshot)>> {
        let quotes = self.fetch_snapshot().await?;

        for pair in &self.triangles {
            let surface = match self.engine.evaluate(pair, &quotes, self.routes.as_ref()) {
                Ok(Some(surface)) => surface,
                Ok(None) => continue,
                Err(e) => {
                    debug!("{}: {}", pair, e);
                    continue;
                }
            };

            ScannerStats::bump(&self.stats.surface_candidates);
            info!(
                pair = %pair,
                direction = %surface.direction,
                "Surface opportunity {}: {:.4}%",
                surface.route(),
                surface.profit_loss_pct
            );

            match self.confirm(&surface, &quotes).await {
                Ok(opp) if opp.real_profit_loss_pct > self.config.min_real_profit_pct => {
                    ScannerStats::bump(&self.stats.confirmed);
                    info!(
                        "Depth-confirmed {}: {:.4}% on {:.8} {} -> {:.8}",
                        opp.surface.route(),
                        opp.real_profit_loss_pct,
                        opp.starting_amount,
                        opp.starting_currency(),
                        opp.final_amount
                    );
                    return Ok(Some((opp, quotes)));
                }
                Ok(opp) => debug!(
                    "Discarded {}: real {:.4}% below {:.4}%",
                    opp.surface.route(),
                    opp.real_profit_loss_pct,
                    self.config.min_real_profit_pct
                ),
                Err(e) => debug!("Discarded {}: {}", surface.route(), e),
            }
        }

        Ok(None)
    }

    /// Scan once and act on the result. Never fails; errors are logged.
    pub async fn tick(&self) -> Option<ExecutionOutcome> {
        ScannerStats::bump(&self.stats.ticks);

        let (opp, quotes) = match self.scan_once().await {
            Ok(Some(found)) => found,
            Ok(None) => return None,
            Err(e) => {
                ScannerStats::bump(&self.stats.data_unavailable);
                warn!("Scan skipped: {}", e);
                return None;
            }
        };

        if !self.config.mode.places_orders() {
            info!(
                pair = %opp.surface.pair,
                "[ALERT] {} {:.4}% (execution disabled)",
                opp.surface.route(),
                opp.real_profit_loss_pct
            );
            return None;
        }

        ScannerStats::bump(&self.stats.executions);
        let outcome = self.orchestrator.execute(&opp, &quotes).await;
        match &outcome {
            ExecutionOutcome::Completed { .. } => ScannerStats::bump(&self.stats.completed),
            ExecutionOutcome::PartialExposure { .. } => {
                ScannerStats::bump(&self.stats.partial_exposures)
            }
            ExecutionOutcome::Aborted { .. } => {}
        }
        Some(outcome)
    }

    /// Loop until `running` is cleared or the tick budget is spent.
    ///
    /// The flag is only checked between ticks, so an execution in flight
    /// always runs to a terminal state.
    pub async fn run(&self, running: &AtomicBool) {
        info!(
            "Scanner started: {} triangles on {}, mode {:?}",
            self.triangles.len(),
            self.config.reference_venue,
            self.config.mode
        );

        while running.load(Ordering::SeqCst) {
            self.tick().await;

            if let Some(max) = self.config.max_ticks {
                if self.stats.ticks.load(Ordering::Relaxed) >= max {
                    info!("Tick budget of {} reached", max);
                    break;
                }
            }
            tokio::time::sleep(self.config.scan_interval).await;
        }

        info!("Scanner stopped: {}", self.stats.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests::{harness, quotes, test_config, Harness};
    use crate::MockFill;
    use pretty_assertions::assert_eq;
    use triarb_core::{OrderBook, SymbolCatalog};
    use triarb_engine::find_triangles;

    fn scanner(h: &Harness, mode: ExecutionMode) -> OpportunityScanner {
        let catalog = SymbolCatalog::from_listing(
            Exchange::Kucoin,
            ["BTC-USDT", "ETH-USDT", "ETH-BTC"],
            h.routes.symbol_map(),
        );
        let triangles = find_triangles(catalog.symbols());
        let orchestrator = Arc::new(ExecutionOrchestrator::new(
            h.gateway.clone(),
            h.routes.clone(),
            h.balances.clone(),
            test_config(),
        ));
        OpportunityScanner::new(
            ScannerConfig {
                mode,
                slippage_tolerance: 0.0,
                max_ticks: Some(3),
                ..ScannerConfig::default()
            },
            h.gateway.clone(),
            h.routes.clone(),
            orchestrator,
            triangles,
        )
    }

    #[tokio::test]
    async fn test_snapshot_uses_canonical_ids() {
        let h = harness();
        let scanner = scanner(&h, ExecutionMode::AlertOnly);
        let snapshot = scanner.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get("ETH-BTC"), quotes().get("ETH-BTC"));
    }

    #[tokio::test]
    async fn test_confirms_candidate_in_alert_mode_without_orders() {
        let h = harness();
        let scanner = scanner(&h, ExecutionMode::AlertOnly);

        let (opp, _) = scanner.scan_once().await.unwrap().unwrap();
        assert_eq!(opp.legs[0].venue, Exchange::Kucoin);
        assert_eq!(opp.legs[1].venue_symbol, "ETHUSDT");
        assert_eq!(opp.legs[2].venue_symbol, "ETHBTC");
        assert!(opp.real_profit_loss_pct > 0.003);

        assert!(scanner.tick().await.is_none());
        assert!(h.kucoin.submitted_orders().is_empty());
        assert!(h.binance.submitted_orders().is_empty());

        let stats = scanner.stats().snapshot();
        assert_eq!(stats.confirmed, 2);
        assert_eq!(stats.executions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_mode_executes() {
        let h = harness();
        let scanner = scanner(&h, ExecutionMode::Auto);
        scanner.orchestrator.sync_balances().await;

        let outcome = scanner.tick().await.unwrap();
        assert!(outcome.is_completed(), "{}", outcome);
        assert_eq!(h.binance.submitted_orders().len(), 2);
        assert_eq!(scanner.stats().snapshot().completed, 1);
    }

    #[tokio::test]
    async fn test_thin_book_discards_candidate() {
        let h = harness();
        h.binance
            .set_book("ETHBTC", OrderBook::from_levels(&[(0.0505, 0.001)], &[(0.0506, 0.001)]));
        let scanner = scanner(&h, ExecutionMode::Auto);

        assert!(scanner.scan_once().await.unwrap().is_none());
        let stats = scanner.stats().snapshot();
        assert_eq!(stats.surface_candidates, 1);
        assert_eq!(stats.confirmed, 0);
    }

    #[tokio::test]
    async fn test_quote_outage_is_logged_and_skipped() {
        let h = harness();
        h.kucoin.set_fail_quotes(true);
        let scanner = scanner(&h, ExecutionMode::Auto);

        assert!(scanner.tick().await.is_none());
        let stats = scanner.stats().snapshot();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.data_unavailable, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_tick_budget() {
        let h = harness();
        let scanner = scanner(&h, ExecutionMode::AlertOnly);
        let running = AtomicBool::new(true);

        scanner.run(&running).await;
        assert_eq!(scanner.stats().snapshot().ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_execution_lets_legs_finish() {
        let h = harness();
        h.binance.set_symbol_fill_mode("ETHUSDT", MockFill::Never);
        let scanner = scanner(&h, ExecutionMode::Auto);
        scanner.orchestrator.sync_balances().await;
        let running = AtomicBool::new(true);

        let start = tokio::time::Instant::now();
        tokio::join!(scanner.run(&running), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            running.store(false, Ordering::SeqCst);
        });

        // Leg 2 ran to its timeout and was cancelled before the loop exited
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(h.binance.canceled_orders().len(), 1);
        let stats = scanner.stats().snapshot();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.executions, 1);
        assert_eq!(stats.partial_exposures, 1);
    }

    #[tokio::test]
    async fn test_run_exits_when_flag_cleared() {
        let h = harness();
        let scanner = scanner(&h, ExecutionMode::AlertOnly);
        let running = AtomicBool::new(false);

        scanner.run(&running).await;
        assert_eq!(scanner.stats().snapshot().ticks, 0);
    }
}
