//! Application state management.

use crate::config::AppConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use triarb_core::{now_ms, SymbolCatalog, TriangularPair};
use triarb_engine::find_triangles;
use triarb_executor::{
    BalanceTracker, ExecutionConfig, ExecutionOrchestrator, ExecutorError, ExecutorResult,
    OpportunityScanner, RoutePlanner, ScannerConfig, VenueGateway,
};

/// Application state shared across components.
pub struct AppState {
    /// Configuration, with CLI overrides applied.
    pub config: AppConfig,
    pub gateway: Arc<VenueGateway>,
    pub routes: Arc<RoutePlanner>,
    pub orchestrator: Arc<ExecutionOrchestrator>,
    /// Running flag.
    running: AtomicBool,
    started_at_ms: u64,
}

impl AppState {
    /// Wire routing, balances and execution around a gateway.
    pub fn new(config: AppConfig, gateway: VenueGateway) -> Self {
        let gateway = Arc::new(gateway);
        let routes = Arc::new(RoutePlanner::new(
            config.symbols.clone(),
            config.venues.leg_venues.clone(),
            config.venues.fees.clone(),
        ));
        let balances = Arc::new(BalanceTracker::new(config.currencies.clone()));
        let orchestrator = Arc::new(ExecutionOrchestrator::new(
            gateway.clone(),
            routes.clone(),
            balances,
            ExecutionConfig::from(&config.execution),
        ));

        Self {
            config,
            gateway,
            routes,
            orchestrator,
            running: AtomicBool::new(false),
            started_at_ms: now_ms(),
        }
    }

    pub fn balances(&self) -> &Arc<BalanceTracker> {
        self.orchestrator.balances()
    }

    /// List every venue's markets and find the reference venue's triangles.
    ///
    /// Listing non-reference venues only primes their size increments, so a
    /// failure there is logged and skipped.
    pub async fn discover_triangles(&self) -> ExecutorResult<Vec<TriangularPair>> {
        let reference = self.config.scanner.reference_venue;
        if !self.gateway.has_venue(reference) {
            return Err(ExecutorError::UnknownVenue(reference));
        }

        for venue in self.gateway.venues() {
            if venue == reference {
                continue;
            }
            if let Err(e) = self.gateway.list_symbols(venue).await {
                warn!("[{}] Symbol listing failed: {}", venue, e);
            }
        }

        let listing = self.gateway.list_symbols(reference).await?;
        let catalog = SymbolCatalog::from_listing(
            reference,
            listing.iter().map(|l| l.name.as_str()),
            &self.config.symbols,
        );
        info!(
            "[{}] {} of {} listed symbols are mapped",
            reference,
            catalog.len(),
            listing.len()
        );

        let triangles = find_triangles(catalog.symbols());
        info!("🔺 Found {} triangles", triangles.len());
        for triangle in &triangles {
            info!("  {}", triangle);
        }
        Ok(triangles)
    }

    /// Scanner over `triangles` sharing this state's gateway and orchestrator.
    pub fn scanner(&self, triangles: Vec<TriangularPair>) -> OpportunityScanner {
        OpportunityScanner::new(
            ScannerConfig::from(&self.config),
            self.gateway.clone(),
            self.routes.clone(),
            self.orchestrator.clone(),
            triangles,
        )
    }

    /// Start the bot.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    /// Stop the bot.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn running_flag(&self) -> &AtomicBool {
        &self.running
    }

    pub fn uptime_secs(&self) -> u64 {
        now_ms().saturating_sub(self.started_at_ms) / 1000
    }
}

/// Shared state handle.
pub type SharedState = Arc<AppState>;

/// Create shared state.
pub fn create_state(config: AppConfig, gateway: VenueGateway) -> SharedState {
    Arc::new(AppState::new(config, gateway))
}
