//! Simulated venues.
//!
//! Every configured venue gets an in-memory client listing the venue's side
//! of the symbol map, priced from a fixed USD table. A background task
//! drifts the reference venue's quotes so cross rates dislocate from time
//! to time.

use crate::config::AppConfig;
use crate::state::SharedState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use triarb_core::{Exchange, OrderBook, Symbol};
use triarb_executor::{MockVenueClient, RateLimiter, VenueClient, VenueGateway};

/// Synthetic USD prices.
const USD_PRICES: &[(&str, f64)] = &[
    ("USDT", 1.0),
    ("BTC", 60_000.0),
    ("ETH", 3_000.0),
    ("BNB", 600.0),
    ("XRP", 0.5),
];

const HALF_SPREAD: f64 = 0.0001;
const DRIFT_AMPLITUDE: f64 = 0.003;
const BOOK_LEVELS: usize = 5;
const LEVEL_STEP: f64 = 0.0005;
/// USD value resting on each book level.
const LEVEL_NOTIONAL_USD: f64 = 25_000.0;
/// USD value of each seeded balance.
const BALANCE_USD: f64 = 10_000.0;
/// Per-venue price offset, times the venue's index.
const VENUE_SKEW: f64 = 0.0002;

fn usd_price(currency: &str) -> Option<f64> {
    USD_PRICES
        .iter()
        .find(|(c, _)| *c == currency)
        .map(|(_, price)| *price)
}

fn base_increment(base_usd: f64) -> f64 {
    if base_usd >= 1_000.0 {
        0.000001
    } else if base_usd >= 10.0 {
        0.0001
    } else {
        0.1
    }
}

struct SimulatedMarket {
    venue_symbol: String,
    mid: f64,
    /// Drift phase offset so markets move out of step.
    phase: f64,
    /// Base quantity per book level.
    level_quantity: f64,
}

impl SimulatedMarket {
    fn publish(&self, client: &MockVenueClient, factor: f64) {
        let mid = self.mid * factor;
        let bid = mid * (1.0 - HALF_SPREAD);
        let ask = mid * (1.0 + HALF_SPREAD);

        let bids: Vec<(f64, f64)> = (0..BOOK_LEVELS)
            .map(|k| (bid * (1.0 - k as f64 * LEVEL_STEP), self.level_quantity))
            .collect();
        let asks: Vec<(f64, f64)> = (0..BOOK_LEVELS)
            .map(|k| (ask * (1.0 + k as f64 * LEVEL_STEP), self.level_quantity))
            .collect();

        client.set_quote(&self.venue_symbol, bid, ask);
        client.set_book(&self.venue_symbol, OrderBook::from_levels(&bids, &asks));
    }
}

struct SimulatedVenue {
    client: Arc<MockVenueClient>,
    markets: Vec<SimulatedMarket>,
}

/// Simulated venue set.
pub struct MarketSimulator {
    reference: Exchange,
    venues: Vec<SimulatedVenue>,
}

impl MarketSimulator {
    pub fn new(config: &AppConfig) -> Self {
        let mut venues = Vec::new();

        for (index, venue) in config.all_venues().into_iter().enumerate() {
            let skew = 1.0 + index as f64 * VENUE_SKEW;
            let mut client = MockVenueClient::new(venue).with_fee(config.venues.fees.fee_for(venue));
            let mut markets = Vec::new();

            for (canonical, venue_symbol) in config.symbols.for_venue(venue) {
                let symbol = match Symbol::parse(canonical, venue) {
                    Ok(symbol) => symbol,
                    Err(e) => {
                        warn!("[{}] Skipping {}: {}", venue, canonical, e);
                        continue;
                    }
                };
                let (Some(base_usd), Some(quote_usd)) =
                    (usd_price(&symbol.base), usd_price(&symbol.quote))
                else {
                    debug!("[{}] No synthetic price for {}", venue, canonical);
                    continue;
                };

                client = client.with_listing(
                    venue_symbol,
                    &symbol.base,
                    &symbol.quote,
                    Some(base_increment(base_usd)),
                );
                markets.push(SimulatedMarket {
                    venue_symbol: venue_symbol.to_string(),
                    mid: base_usd / quote_usd * skew,
                    phase: markets.len() as f64 * 1.7,
                    level_quantity: LEVEL_NOTIONAL_USD / base_usd,
                });
            }

            for currency in &config.currencies {
                if let Some(price) = usd_price(currency) {
                    client.set_balance(currency, BALANCE_USD / price);
                }
            }

            for market in &markets {
                market.publish(&client, 1.0);
            }

            debug!("[{}] Simulating {} markets", venue, markets.len());
            venues.push(SimulatedVenue {
                client: Arc::new(client),
                markets,
            });
        }

        Self {
            reference: config.scanner.reference_venue,
            venues,
        }
    }

    /// Gateway with every simulated client registered.
    pub fn gateway(&self, limiter: Arc<RateLimiter>) -> VenueGateway {
        let mut gateway = VenueGateway::new(limiter);
        for venue in &self.venues {
            gateway.register_client(venue.client.clone());
        }
        gateway
    }

    pub fn client(&self, venue: Exchange) -> Option<Arc<MockVenueClient>> {
        self.venues
            .iter()
            .find(|v| v.client.exchange() == venue)
            .map(|v| v.client.clone())
    }

    /// Reprice the reference venue for drift step `counter`.
    pub fn step(&self, counter: u64) {
        let Some(venue) = self
            .venues
            .iter()
            .find(|v| v.client.exchange() == self.reference)
        else {
            return;
        };
        for market in &venue.markets {
            let factor = 1.0 + (counter as f64 * 0.05 + market.phase).sin() * DRIFT_AMPLITUDE;
            market.publish(&venue.client, factor);
        }
    }
}

/// Drift the reference venue's prices until the bot stops.
pub async fn run_price_simulator(simulator: Arc<MarketSimulator>, state: SharedState) {
    info!("Starting price simulator");

    let mut counter = 0u64;
    while state.is_running() {
        counter += 1;
        simulator.step(counter);
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    info!("Price simulator stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use triarb_core::SymbolCatalog;
    use triarb_engine::find_triangles;

    fn simulator() -> MarketSimulator {
        MarketSimulator::new(&AppConfig::default())
    }

    fn gateway(sim: &MarketSimulator) -> VenueGateway {
        sim.gateway(Arc::new(RateLimiter::default()))
    }

    #[tokio::test]
    async fn test_registers_every_venue() {
        let sim = simulator();
        let gateway = gateway(&sim);

        assert_eq!(
            gateway.venues().len(),
            3,
            "KuCoin, Binance and OKX are configured by default"
        );
        let listing = gateway.list_symbols(Exchange::Binance).await.unwrap();
        assert_eq!(listing.len(), 8);
        assert!(listing.iter().any(|l| l.name == "ETHBTC"));
        assert_eq!(gateway.increment(Exchange::Binance, "BTCUSDT"), Some(0.000001));
    }

    #[tokio::test]
    async fn test_reference_cross_rates_consistent_at_start() {
        let sim = simulator();
        let quotes = gateway(&sim).fetch_quotes(Exchange::Kucoin).await.unwrap();

        let mid = |s: &str| quotes[s].mid().unwrap();
        let implied = mid("ETH-USDT") / mid("BTC-USDT");
        assert!((mid("ETH-BTC") - implied).abs() / implied < 1e-9);
    }

    #[tokio::test]
    async fn test_step_moves_only_reference_venue() {
        let sim = simulator();
        let gateway = gateway(&sim);
        let kucoin_before = gateway.fetch_quotes(Exchange::Kucoin).await.unwrap();
        let binance_before = gateway.fetch_quotes(Exchange::Binance).await.unwrap();

        sim.step(7);

        let kucoin_after = gateway.fetch_quotes(Exchange::Kucoin).await.unwrap();
        let binance_after = gateway.fetch_quotes(Exchange::Binance).await.unwrap();
        assert_ne!(kucoin_before["ETH-USDT"], kucoin_after["ETH-USDT"]);
        assert_eq!(binance_before, binance_after);
    }

    #[test]
    fn test_balances_seeded() {
        let sim = simulator();
        let kucoin = sim.client(Exchange::Kucoin).unwrap();
        assert_eq!(kucoin.balance("USDT"), 10_000.0);
        assert!((kucoin.balance("BTC") - 10_000.0 / 60_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_unconfigured_venue_is_not_simulated() {
        let mut config = AppConfig::default();
        config.venues.leg_venues = [
            vec![Exchange::Kucoin],
            vec![Exchange::Binance],
            vec![Exchange::Binance],
        ];
        let sim = MarketSimulator::new(&config);
        assert!(sim.client(Exchange::Binance).is_some());
        assert!(sim.client(Exchange::Okx).is_none());
    }

    #[tokio::test]
    async fn test_default_market_set_forms_triangles() {
        let config = AppConfig::default();
        let sim = MarketSimulator::new(&config);
        let listing = gateway(&sim).list_symbols(Exchange::Kucoin).await.unwrap();

        let catalog = SymbolCatalog::from_listing(
            Exchange::Kucoin,
            listing.iter().map(|l| l.name.as_str()),
            &config.symbols,
        );
        // {USDT, BTC} with each of ETH, BNB, XRP; {USDT, ETH, BNB}; {BTC, ETH, BNB}
        assert_eq!(find_triangles(catalog.symbols()).len(), 5);
    }
}
