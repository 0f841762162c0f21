//! Triangular Arbitrage Bot - Headless Server
//!
//! Scans one venue's quotes for triangular cycles, confirms them against
//! live order book depth and, in auto mode, executes the three legs across
//! venues.

mod config;
mod simulator;
mod state;

use clap::Parser;
use config::AppConfig;
use simulator::{run_price_simulator, MarketSimulator};
use state::create_state;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use triarb_core::ExecutionMode;
use triarb_executor::RateLimiter;

/// Triangular Arbitrage Bot CLI
#[derive(Parser, Debug)]
#[command(name = "triarb")]
#[command(about = "Cross-venue triangular arbitrage bot", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "triarb.json")]
    config: PathBuf,

    /// Log level: trace, debug, info, warn, error (overrides the config)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Execution mode: auto, alert (overrides the config)
    #[arg(short, long)]
    mode: Option<String>,

    /// Minimum surface and depth-adjusted profit in percent
    #[arg(short = 'p', long)]
    min_profit: Option<f64>,

    /// Stop after this many scans
    #[arg(long)]
    max_ticks: Option<u64>,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(mode) = &args.mode {
        config.scanner.mode = ExecutionMode::from_name(mode);
    }
    if let Some(min_profit) = args.min_profit {
        config.scanner.min_surface_profit_pct = min_profit;
        config.scanner.min_real_profit_pct = min_profit;
    }
    if args.max_ticks.is_some() {
        config.scanner.max_ticks = args.max_ticks;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let loaded = AppConfig::load(&args.config);
    let level = match (&args.log_level, &loaded) {
        (Some(level), _) => level.clone(),
        (None, Ok(Some(config))) => config.log_level.clone(),
        _ => "info".to_string(),
    };
    init_logging(&level);

    info!("🚀 Triangular arbitrage bot starting...");

    let mut config = match loaded {
        Ok(Some(config)) => {
            info!("Loaded configuration from {}", args.config.display());
            config
        }
        Ok(None) => {
            info!(
                "No configuration at {}, using defaults",
                args.config.display()
            );
            AppConfig::default()
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    apply_overrides(&mut config, &args);
    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    info!(
        "Mode: {:?} | Reference: {} | Min profit: {}% surface, {}% real",
        config.scanner.mode,
        config.scanner.reference_venue,
        config.scanner.min_surface_profit_pct,
        config.scanner.min_real_profit_pct
    );
    if config.scanner.mode.places_orders() {
        warn!("Auto mode: confirmed opportunities will be executed");
    }

    let simulator = Arc::new(MarketSimulator::new(&config));
    let limiter = Arc::new(RateLimiter::new(config.venues.rate_limits.clone()));
    let state = create_state(config, simulator.gateway(limiter));
    info!("Simulated venues: {:?}", state.gateway.venues());

    let triangles = match state.discover_triangles().await {
        Ok(triangles) => triangles,
        Err(e) => {
            error!("Triangle discovery failed: {}", e);
            std::process::exit(1);
        }
    };
    if triangles.is_empty() {
        warn!("No triangles found, nothing to scan");
        return;
    }

    let balances = state.orchestrator.sync_balances().await;
    info!("💰 Initial balances: {}", balances);

    state.start();

    let scanner = state.scanner(triangles);
    let stats = scanner.stats();
    let scanner_state = state.clone();
    let mut scanner_handle = tokio::spawn(async move {
        scanner.run(scanner_state.running_flag()).await;
    });
    let simulator_handle = tokio::spawn(run_price_simulator(simulator, state.clone()));

    info!("Press Ctrl+C to stop...");

    let scanner_finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.expect("Failed to listen for Ctrl+C");
            warn!("Shutdown signal received");
            false
        }
        _ = &mut scanner_handle => true,
    };
    state.stop();

    // An execution in flight always runs its legs to a terminal state
    if !scanner_finished {
        info!("Waiting for the current scan to finish...");
        if let Err(e) = scanner_handle.await {
            error!("Scanner task failed: {}", e);
        }
    }
    let _ = tokio::time::timeout(Duration::from_secs(1), simulator_handle).await;

    let summary = stats.snapshot();
    info!("📈 Final Stats:");
    info!("  Total uptime: {} seconds", state.uptime_secs());
    info!("  Scans: {}", summary.ticks);
    info!("  Surface candidates: {}", summary.surface_candidates);
    info!("  Confirmed: {}", summary.confirmed);
    info!(
        "  Executions: {} ({} completed, {} partial)",
        summary.executions, summary.completed, summary.partial_exposures
    );
    info!("  Data unavailable: {}", summary.data_unavailable);
    state.balances().log_snapshot("Final balances").await;

    info!("👋 Goodbye!");
}
