//! In-memory venue client.
//!
//! Scriptable stand-in for a real venue: listings, quotes, books and
//! balances are set directly, and order fills follow a configurable
//! behaviour. Used by tests and by the server's simulated mode.

use crate::{
    ExecutorError, ExecutorResult, OrderRequest, SymbolListing, VenueClient, VenueOrderStatus,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use triarb_core::{Currency, Exchange, OrderBook, Quote, TradeSide};

/// How the mock treats submitted orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockFill {
    /// Fill at the limit price on submission and settle balances.
    #[default]
    Immediate,
    /// Accept the order and leave it open forever.
    Never,
    /// Refuse the order at submission.
    Reject,
}

#[derive(Debug)]
struct MockOrder {
    venue_symbol: String,
    status: VenueOrderStatus,
}

#[derive(Debug, Default)]
struct MockState {
    listings: Vec<SymbolListing>,
    quotes: HashMap<String, Quote>,
    books: HashMap<String, OrderBook>,
    balances: HashMap<Currency, f64>,
    fill: MockFill,
    fill_overrides: HashMap<String, MockFill>,
    orders: HashMap<String, MockOrder>,
    submitted: Vec<OrderRequest>,
    canceled: Vec<String>,
    fail_quotes: bool,
    fail_books: bool,
    fail_cancel: bool,
}

/// Mock venue client for testing and simulation.
pub struct MockVenueClient {
    exchange: Exchange,
    /// Taker fee charged on simulated fills.
    fee: f64,
    state: Mutex<MockState>,
    order_counter: AtomicU64,
}

impl MockVenueClient {
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            fee: 0.001,
            state: Mutex::new(MockState::default()),
            order_counter: AtomicU64::new(1),
        }
    }

    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = fee;
        self
    }

    /// Add a listed market.
    pub fn with_listing(self, name: &str, base: &str, quote: &str, base_increment: Option<f64>) -> Self {
        self.state().listings.push(SymbolListing {
            name: name.to_string(),
            base: Currency::from(base),
            quote: Currency::from(quote),
            base_increment,
        });
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_quote(&self, venue_symbol: &str, bid: f64, ask: f64) {
        self.state()
            .quotes
            .insert(venue_symbol.to_string(), Quote::new(bid, ask));
    }

    pub fn set_book(&self, venue_symbol: &str, book: OrderBook) {
        self.state().books.insert(venue_symbol.to_string(), book);
    }

    /// Set the quote and a single-level book with `quantity` on each side.
    pub fn set_market(&self, venue_symbol: &str, bid: f64, ask: f64, quantity: f64) {
        self.set_quote(venue_symbol, bid, ask);
        self.set_book(
            venue_symbol,
            OrderBook::from_levels(&[(bid, quantity)], &[(ask, quantity)]),
        );
    }

    pub fn set_balance(&self, currency: &str, amount: f64) {
        self.state().balances.insert(Currency::from(currency), amount);
    }

    pub fn balance(&self, currency: &str) -> f64 {
        self.state().balances.get(currency).copied().unwrap_or(0.0)
    }

    pub fn set_fill_mode(&self, fill: MockFill) {
        self.state().fill = fill;
    }

    /// Override fill behaviour for one venue symbol.
    pub fn set_symbol_fill_mode(&self, venue_symbol: &str, fill: MockFill) {
        self.state()
            .fill_overrides
            .insert(venue_symbol.to_string(), fill);
    }

    pub fn set_fail_quotes(&self, fail: bool) {
        self.state().fail_quotes = fail;
    }

    pub fn set_fail_books(&self, fail: bool) {
        self.state().fail_books = fail;
    }

    pub fn set_fail_cancel(&self, fail: bool) {
        self.state().fail_cancel = fail;
    }

    /// Every order request received, in submission order.
    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.state().submitted.clone()
    }

    /// Ids of orders cancelled through this client.
    pub fn canceled_orders(&self) -> Vec<String> {
        self.state().canceled.clone()
    }

    fn apply_fill(&self, state: &mut MockState, request: &OrderRequest) -> ExecutorResult<()> {
        let listing = state
            .listings
            .iter()
            .find(|l| l.name == request.venue_symbol)
            .cloned()
            .ok_or_else(|| {
                ExecutorError::OrderRejected(format!("unknown symbol {}", request.venue_symbol))
            })?;

        let notional = request.size * request.price;
        let (spend_currency, spend, receive_currency, receive) = match request.side {
            TradeSide::Buy => (
                listing.quote,
                notional,
                listing.base,
                request.size * (1.0 - self.fee),
            ),
            TradeSide::Sell => (
                listing.base,
                request.size,
                listing.quote,
                notional * (1.0 - self.fee),
            ),
        };

        let available = state.balances.get(&spend_currency).copied().unwrap_or(0.0);
        if spend > available * (1.0 + 1e-9) {
            return Err(ExecutorError::OrderRejected(format!(
                "insufficient {}: need {}, have {}",
                spend_currency, spend, available
            )));
        }

        *state.balances.entry(spend_currency).or_insert(0.0) = (available - spend).max(0.0);
        *state.balances.entry(receive_currency).or_insert(0.0) += receive;
        Ok(())
    }
}

#[async_trait]
impl VenueClient for MockVenueClient {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    async fn list_symbols(&self) -> ExecutorResult<Vec<SymbolListing>> {
        Ok(self.state().listings.clone())
    }

    async fn fetch_quotes(&self) -> ExecutorResult<HashMap<String, Quote>> {
        let state = self.state();
        if state.fail_quotes {
            return Err(ExecutorError::ExchangeError("Mock quote failure".to_string()));
        }
        Ok(state.quotes.clone())
    }

    async fn fetch_order_book(&self, venue_symbol: &str, depth: usize) -> ExecutorResult<OrderBook> {
        let state = self.state();
        if state.fail_books {
            return Err(ExecutorError::ExchangeError("Mock book failure".to_string()));
        }
        state
            .books
            .get(venue_symbol)
            .cloned()
            .map(|book| book.truncated(depth))
            .ok_or_else(|| ExecutorError::ExchangeError(format!("Unknown symbol: {}", venue_symbol)))
    }

    async fn submit_order(&self, request: &OrderRequest) -> ExecutorResult<String> {
        let mut state = self.state();
        state.submitted.push(request.clone());

        let fill = state
            .fill_overrides
            .get(&request.venue_symbol)
            .copied()
            .unwrap_or(state.fill);

        let status = match fill {
            MockFill::Reject => {
                return Err(ExecutorError::OrderRejected("Mock rejection".to_string()));
            }
            MockFill::Never => VenueOrderStatus::Open,
            MockFill::Immediate => {
                self.apply_fill(&mut state, request)?;
                VenueOrderStatus::Filled
            }
        };

        let id = format!("MOCK_{}", self.order_counter.fetch_add(1, Ordering::SeqCst));
        state.orders.insert(
            id.clone(),
            MockOrder {
                venue_symbol: request.venue_symbol.clone(),
                status,
            },
        );
        Ok(id)
    }

    async fn order_status(&self, venue_symbol: &str, order_id: &str) -> ExecutorResult<VenueOrderStatus> {
        self.state()
            .orders
            .get(order_id)
            .filter(|o| o.venue_symbol == venue_symbol)
            .map(|o| o.status)
            .ok_or_else(|| ExecutorError::ExchangeError(format!("Unknown order: {}", order_id)))
    }

    async fn cancel_order(&self, venue_symbol: &str, order_id: &str) -> ExecutorResult<()> {
        let mut state = self.state();
        if state.fail_cancel {
            return Err(ExecutorError::ExchangeError("Mock cancel failure".to_string()));
        }
        let order = state
            .orders
            .get_mut(order_id)
            .filter(|o| o.venue_symbol == venue_symbol)
            .ok_or_else(|| ExecutorError::ExchangeError(format!("Unknown order: {}", order_id)))?;
        if order.status == VenueOrderStatus::Open {
            order.status = VenueOrderStatus::Closed;
        }
        state.canceled.push(order_id.to_string());
        Ok(())
    }

    async fn balances(&self, currencies: &[Currency]) -> ExecutorResult<HashMap<Currency, f64>> {
        let state = self.state();
        Ok(currencies
            .iter()
            .map(|c| (c.clone(), state.balances.get(c).copied().unwrap_or(0.0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> MockVenueClient {
        let client = MockVenueClient::new(Exchange::Binance)
            .with_fee(0.0)
            .with_listing("ETHUSDT", "ETH", "USDT", Some(0.0001));
        client.set_balance("USDT", 1_000.0);
        client
    }

    fn buy(size: f64, price: f64) -> OrderRequest {
        OrderRequest {
            venue_symbol: "ETHUSDT".to_string(),
            side: TradeSide::Buy,
            size,
            price,
            stop_price: None,
        }
    }

    #[tokio::test]
    async fn test_immediate_fill_settles_balances() {
        let client = client();
        let id = client.submit_order(&buy(0.1, 3_000.0)).await.unwrap();

        assert_eq!(
            client.order_status("ETHUSDT", &id).await.unwrap(),
            VenueOrderStatus::Filled
        );
        assert!((client.balance("USDT") - 700.0).abs() < 1e-9);
        assert!((client.balance("ETH") - 0.1).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_insufficient_funds_rejected() {
        let client = client();
        let result = client.submit_order(&buy(1.0, 3_000.0)).await;
        assert!(matches!(result, Err(ExecutorError::OrderRejected(_))));
        assert_eq!(client.balance("USDT"), 1_000.0);
    }

    #[tokio::test]
    async fn test_never_fill_then_cancel() {
        let client = client();
        client.set_fill_mode(MockFill::Never);
        let id = client.submit_order(&buy(0.1, 3_000.0)).await.unwrap();
        assert_eq!(
            client.order_status("ETHUSDT", &id).await.unwrap(),
            VenueOrderStatus::Open
        );

        client.cancel_order("ETHUSDT", &id).await.unwrap();
        assert_eq!(
            client.order_status("ETHUSDT", &id).await.unwrap(),
            VenueOrderStatus::Closed
        );
        assert_eq!(client.canceled_orders(), vec![id]);
        assert_eq!(client.balance("USDT"), 1_000.0);
    }

    #[tokio::test]
    async fn test_symbol_override_and_failures() {
        let client = client();
        client.set_symbol_fill_mode("ETHUSDT", MockFill::Reject);
        assert!(client.submit_order(&buy(0.1, 3_000.0)).await.is_err());
        assert_eq!(client.submitted_orders().len(), 1);

        client.set_market("ETHUSDT", 2_999.0, 3_001.0, 5.0);
        assert_eq!(client.fetch_quotes().await.unwrap().len(), 1);
        client.set_fail_quotes(true);
        assert!(client.fetch_quotes().await.is_err());
        client.set_fail_books(true);
        assert!(client.fetch_order_book("ETHUSDT", 10).await.is_err());
    }

    #[tokio::test]
    async fn test_balances_report_zero_for_unknown() {
        let client = client();
        let balances = client
            .balances(&[Currency::from("USDT"), Currency::from("XRP")])
            .await
            .unwrap();
        assert_eq!(balances.get("USDT"), Some(&1_000.0));
        assert_eq!(balances.get("XRP"), Some(&0.0));
    }
}
