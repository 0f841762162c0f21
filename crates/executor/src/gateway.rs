//! Rate-limited access to registered venue clients.

use crate::{
    ExecutorError, ExecutorResult, OrderRequest, RateLimiter, SymbolListing, VenueClient,
    VenueOrderStatus,
};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use triarb_core::{Currency, Exchange, OrderBook, Quote};

/// Registry of venue clients. Every outbound call waits on the shared
/// rate limiter first.
pub struct VenueGateway {
    clients: HashMap<Exchange, Arc<dyn VenueClient>>,
    limiter: Arc<RateLimiter>,
    /// Base size increments per (venue, venue symbol), learned from listings.
    increments: DashMap<(Exchange, String), f64>,
}

impl VenueGateway {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            clients: HashMap::new(),
            limiter,
            increments: DashMap::new(),
        }
    }

    /// Register a client under the venue it reports.
    pub fn register_client(&mut self, client: Arc<dyn VenueClient>) {
        self.clients.insert(client.exchange(), client);
    }

    pub fn with_client(mut self, client: Arc<dyn VenueClient>) -> Self {
        self.register_client(client);
        self
    }

    fn client(&self, venue: Exchange) -> ExecutorResult<&Arc<dyn VenueClient>> {
        self.clients
            .get(&venue)
            .ok_or(ExecutorError::UnknownVenue(venue))
    }

    pub fn has_venue(&self, venue: Exchange) -> bool {
        self.clients.contains_key(&venue)
    }

    /// Registered venues, sorted.
    pub fn venues(&self) -> Vec<Exchange> {
        let mut venues: Vec<Exchange> = self.clients.keys().copied().collect();
        venues.sort();
        venues
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// List a venue's markets and remember their size increments.
    pub async fn list_symbols(&self, venue: Exchange) -> ExecutorResult<Vec<SymbolListing>> {
        let client = self.client(venue)?;
        self.limiter.acquire(venue).await;
        let listings = client.list_symbols().await?;
        for listing in &listings {
            if let Some(increment) = listing.base_increment.filter(|i| *i > 0.0) {
                self.increments
                    .insert((venue, listing.name.clone()), increment);
            }
        }
        debug!("[{}] {} symbols listed", venue, listings.len());
        Ok(listings)
    }

    pub async fn fetch_quotes(&self, venue: Exchange) -> ExecutorResult<HashMap<String, Quote>> {
        let client = self.client(venue)?;
        self.limiter.acquire(venue).await;
        client.fetch_quotes().await
    }

    pub async fn fetch_order_book(
        &self,
        venue: Exchange,
        venue_symbol: &str,
        depth: usize,
    ) -> ExecutorResult<OrderBook> {
        let client = self.client(venue)?;
        self.limiter.acquire(venue).await;
        client.fetch_order_book(venue_symbol, depth).await
    }

    pub async fn submit_order(&self, venue: Exchange, request: &OrderRequest) -> ExecutorResult<String> {
        let client = self.client(venue)?;
        self.limiter.acquire(venue).await;
        client.submit_order(request).await
    }

    pub async fn order_status(
        &self,
        venue: Exchange,
        venue_symbol: &str,
        order_id: &str,
    ) -> ExecutorResult<VenueOrderStatus> {
        let client = self.client(venue)?;
        self.limiter.acquire(venue).await;
        client.order_status(venue_symbol, order_id).await
    }

    pub async fn cancel_order(&self, venue: Exchange, venue_symbol: &str, order_id: &str) -> ExecutorResult<()> {
        let client = self.client(venue)?;
        self.limiter.acquire(venue).await;
        client.cancel_order(venue_symbol, order_id).await
    }

    pub async fn balances(
        &self,
        venue: Exchange,
        currencies: &[Currency],
    ) -> ExecutorResult<HashMap<Currency, f64>> {
        let client = self.client(venue)?;
        self.limiter.acquire(venue).await;
        client.balances(currencies).await
    }

    pub fn increment(&self, venue: Exchange, venue_symbol: &str) -> Option<f64> {
        self.increments
            .get(&(venue, venue_symbol.to_string()))
            .map(|entry| *entry)
    }

    /// Round a base size down to the venue's increment for the symbol.
    pub fn round_size(&self, venue: Exchange, venue_symbol: &str, size: f64) -> f64 {
        match self.increment(venue, venue_symbol) {
            Some(increment) => round_down(size, increment),
            None => size,
        }
    }
}

/// Floor `size` to a multiple of `increment`, tolerating float noise just
/// below an exact multiple.
pub fn round_down(size: f64, increment: f64) -> f64 {
    if increment <= 0.0 || !size.is_finite() || size <= 0.0 {
        return size.max(0.0);
    }
    let steps = (size / increment + 1e-9).floor();
    steps * increment
}
