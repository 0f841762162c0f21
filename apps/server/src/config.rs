//! Application configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use triarb_core::{Currency, Exchange, ExecutionMode, SymbolMap};
use triarb_engine::FeeSchedule;
use triarb_executor::{ExecutionConfig, RateLimit, ScannerConfig};

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scanning loop settings.
    pub scanner: ScannerSettings,
    /// Order placement settings.
    pub execution: ExecutionSettings,
    /// Per-venue fees, rate limits and leg routing.
    pub venues: VenueSettings,
    /// Canonical symbol to per-venue spelling.
    pub symbols: SymbolMap,
    /// Currencies whose balances are tracked.
    pub currencies: Vec<Currency>,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerSettings::default(),
            execution: ExecutionSettings::default(),
            venues: VenueSettings::default(),
            symbols: default_symbol_map(),
            currencies: ["USDT", "BTC", "ETH", "BNB", "XRP"]
                .into_iter()
                .map(Currency::from)
                .collect(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file.
    ///
    /// Returns `Ok(None)` when the file does not exist. Omitted fields take
    /// their defaults.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(Some(config))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let exec = &self.execution;
        if exec.max_trade_size.is_nan() || exec.max_trade_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_trade_size must be positive, got {}",
                exec.max_trade_size
            )));
        }
        if exec.order_book_depth == 0 {
            return Err(ConfigError::Invalid("order_book_depth must be at least 1".into()));
        }
        if exec.slippage_tolerance < 0.0 || exec.stop_loss_pct < 0.0 {
            return Err(ConfigError::Invalid(
                "slippage_tolerance and stop_loss_pct must not be negative".into(),
            ));
        }
        if exec.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be at least 1".into()));
        }
        if let Some(leg) = self.venues.leg_venues.iter().position(Vec::is_empty) {
            return Err(ConfigError::Invalid(format!("leg {} has no venues", leg + 1)));
        }
        for (venue, limit) in &self.venues.rate_limits {
            if limit.max_calls == 0 || limit.window_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "rate limit for {} must allow at least one call per non-empty window",
                    venue
                )));
            }
        }
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbol map is empty".into()));
        }
        Ok(())
    }

    /// Every venue the bot talks to: the reference venue plus all leg venues.
    pub fn all_venues(&self) -> Vec<Exchange> {
        let mut venues: Vec<Exchange> = self.venues.leg_venues.iter().flatten().copied().collect();
        venues.push(self.scanner.reference_venue);
        venues.sort();
        venues.dedup();
        venues
    }
}

/// Scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Venue whose quotes drive surface evaluation.
    pub reference_venue: Exchange,
    /// Minimum surface profit in percent.
    pub min_surface_profit_pct: f64,
    /// Minimum depth-adjusted profit in percent.
    pub min_real_profit_pct: f64,
    pub scan_interval_ms: u64,
    pub mode: ExecutionMode,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            reference_venue: Exchange::Kucoin,
            min_surface_profit_pct: 0.003,
            min_real_profit_pct: 0.003,
            scan_interval_ms: 100,
            mode: ExecutionMode::AlertOnly,
            max_ticks: None,
        }
    }
}

/// Execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// First-leg cap, in `reference_currency`.
    pub max_trade_size: f64,
    pub reference_currency: Currency,
    pub order_book_depth: usize,
    pub slippage_tolerance: f64,
    pub stop_loss_pct: f64,
    pub order_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_trade_size: 0.001,
            reference_currency: Currency::from("BTC"),
            order_book_depth: 50,
            slippage_tolerance: 0.001,
            stop_loss_pct: 0.005,
            order_timeout_ms: 10_000,
            poll_interval_ms: 1_000,
            settle_delay_ms: 500,
        }
    }
}

impl From<&ExecutionSettings> for ExecutionConfig {
    fn from(settings: &ExecutionSettings) -> Self {
        ExecutionConfig {
            max_trade_size: settings.max_trade_size,
            reference_currency: settings.reference_currency.clone(),
            order_book_depth: settings.order_book_depth,
            slippage_tolerance: settings.slippage_tolerance,
            stop_loss_pct: settings.stop_loss_pct,
            order_timeout: Duration::from_millis(settings.order_timeout_ms),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
        }
    }
}

impl From<&AppConfig> for ScannerConfig {
    fn from(config: &AppConfig) -> Self {
        let scanner = &config.scanner;
        let execution = &config.execution;
        ScannerConfig {
            reference_venue: scanner.reference_venue,
            min_surface_profit_pct: scanner.min_surface_profit_pct,
            min_real_profit_pct: scanner.min_real_profit_pct,
            scan_interval: Duration::from_millis(scanner.scan_interval_ms),
            order_book_depth: execution.order_book_depth,
            slippage_tolerance: execution.slippage_tolerance,
            max_trade_size: execution.max_trade_size,
            reference_currency: execution.reference_currency.clone(),
            mode: scanner.mode,
            max_ticks: scanner.max_ticks,
        }
    }
}

/// Venue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueSettings {
    pub fees: FeeSchedule,
    pub rate_limits: HashMap<Exchange, RateLimit>,
    /// Candidate venues per leg, in priority order.
    pub leg_venues: [Vec<Exchange>; 3],
}

impl Default for VenueSettings {
    fn default() -> Self {
        let venues = [Exchange::Kucoin, Exchange::Binance, Exchange::Okx];
        Self {
            fees: FeeSchedule::default(),
            rate_limits: venues
                .into_iter()
                .map(|v| (v, RateLimit::for_exchange(v)))
                .collect(),
            leg_venues: [
                vec![Exchange::Kucoin],
                vec![Exchange::Binance, Exchange::Okx],
                vec![Exchange::Binance, Exchange::Okx],
            ],
        }
    }
}

/// Default market set, listed on KuCoin, Binance and OKX.
fn default_symbol_map() -> SymbolMap {
    let mut map = SymbolMap::default();
    for (base, quote) in [
        ("BTC", "USDT"),
        ("ETH", "USDT"),
        ("BNB", "USDT"),
        ("XRP", "USDT"),
        ("ETH", "BTC"),
        ("BNB", "BTC"),
        ("XRP", "BTC"),
        ("BNB", "ETH"),
    ] {
        let canonical = format!("{}-{}", base, quote);
        map.insert(&canonical, Exchange::Kucoin, &canonical);
        map.insert(&canonical, Exchange::Binance, &format!("{}{}", base, quote));
        map.insert(&canonical, Exchange::Okx, &canonical);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("triarb-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.scanner.reference_venue, Exchange::Kucoin);
        assert_eq!(config.scanner.mode, ExecutionMode::AlertOnly);
        assert_eq!(config.execution.max_trade_size, 0.001);
        assert_eq!(config.execution.order_timeout_ms, 10_000);
        assert_eq!(config.symbols.len(), 8);
        assert_eq!(
            config.symbols.venue_symbol("ETH-BTC", Exchange::Binance),
            Some("ETHBTC")
        );
        assert_eq!(config.currencies.len(), 5);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_rate_limits() {
        let config = AppConfig::default();
        assert_eq!(
            config.venues.rate_limits[&Exchange::Kucoin],
            RateLimit::new(100, 60_000)
        );
        assert_eq!(
            config.venues.rate_limits[&Exchange::Okx],
            RateLimit::new(20, 10_000)
        );
        assert_eq!(
            config.all_venues(),
            vec![Exchange::Kucoin, Exchange::Binance, Exchange::Okx]
        );
    }

    #[test]
    fn test_execution_config_conversion() {
        let settings = ExecutionSettings {
            order_timeout_ms: 2_500,
            ..Default::default()
        };
        let config: ExecutionConfig = (&settings).into();
        assert_eq!(config.order_timeout, Duration::from_millis(2_500));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.stop_loss_pct, 0.005);
        assert_eq!(config.reference_currency.as_str(), "BTC");
    }

    #[test]
    fn test_scanner_config_conversion() {
        let mut app = AppConfig::default();
        app.scanner.mode = ExecutionMode::Auto;
        app.scanner.max_ticks = Some(3);
        app.execution.order_book_depth = 20;

        let config: ScannerConfig = (&app).into();
        assert_eq!(config.mode, ExecutionMode::Auto);
        assert_eq!(config.max_ticks, Some(3));
        assert_eq!(config.order_book_depth, 20);
        assert_eq!(config.scan_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{
            "scanner": { "mode": "auto", "min_real_profit_pct": 0.05 },
            "venues": { "leg_venues": [["Kucoin"], ["Okx"], ["Binance"]] }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.scanner.mode, ExecutionMode::Auto);
        assert_eq!(config.scanner.min_real_profit_pct, 0.05);
        assert_eq!(config.scanner.min_surface_profit_pct, 0.003);
        assert_eq!(config.venues.leg_venues[1], vec![Exchange::Okx]);
        assert_eq!(config.execution.order_book_depth, 50);
        assert_eq!(config.symbols, AppConfig::default().symbols);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.scanner.scan_interval_ms, config.scanner.scan_interval_ms);
        assert_eq!(parsed.venues.rate_limits, config.venues.rate_limits);
        assert_eq!(parsed.symbols, config.symbols);
    }

    #[test]
    fn test_validation_rejects_empty_leg() {
        let mut config = AppConfig::default();
        config.venues.leg_venues[2].clear();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: leg 3 has no venues");

        let mut config = AppConfig::default();
        config.execution.max_trade_size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let path = temp_path("missing");
        assert!(AppConfig::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_file() {
        let path = temp_path("valid");
        std::fs::write(&path, r#"{ "log_level": "debug", "scanner": { "max_ticks": 10 } }"#).unwrap();
        let config = AppConfig::load(&path).unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.scanner.max_ticks, Some(10));
    }

    #[test]
    fn test_load_malformed_file() {
        let path = temp_path("malformed");
        std::fs::write(&path, "{ not json").unwrap();
        let result = AppConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
