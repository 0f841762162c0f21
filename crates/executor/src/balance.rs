//! Account balance tracking across venues.
//!
//! Readers take a cheap `Arc` clone of the current snapshot. A refresh
//! builds a complete replacement and swaps it in under the write lock, so
//! no reader observes a half-updated map.

use crate::VenueGateway;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use triarb_core::{now_ms, Currency, Exchange};

/// Immutable view of balances at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceSnapshot {
    pub by_venue: HashMap<Exchange, HashMap<Currency, f64>>,
    pub taken_at_ms: u64,
}

impl BalanceSnapshot {
    /// Available amount of `currency` on one venue.
    pub fn available(&self, venue: Exchange, currency: &str) -> f64 {
        self.by_venue
            .get(&venue)
            .and_then(|balances| balances.get(currency))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum across all venues.
    pub fn total(&self, currency: &str) -> f64 {
        self.by_venue
            .values()
            .filter_map(|balances| balances.get(currency))
            .sum()
    }
}

impl fmt::Display for BalanceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut venues: Vec<&Exchange> = self.by_venue.keys().collect();
        venues.sort();
        for (i, venue) in venues.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}:", venue)?;
            let mut balances: Vec<(&Currency, &f64)> = self.by_venue[venue].iter().collect();
            balances.sort_by(|a, b| a.0.cmp(b.0));
            for (currency, amount) in balances {
                write!(f, " {}={}", currency, amount)?;
            }
        }
        Ok(())
    }
}

/// Process-wide balance state.
pub struct BalanceTracker {
    currencies: Vec<Currency>,
    current: RwLock<Arc<BalanceSnapshot>>,
}

impl BalanceTracker {
    /// Track the given currencies; starts empty until the first refresh.
    pub fn new(currencies: Vec<Currency>) -> Self {
        Self {
            currencies,
            current: RwLock::new(Arc::new(BalanceSnapshot::default())),
        }
    }

    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    pub async fn snapshot(&self) -> Arc<BalanceSnapshot> {
        self.current.read().await.clone()
    }

    /// Re-read balances for `venues` and swap in a new snapshot.
    ///
    /// A venue whose fetch fails keeps its previous values.
    pub(crate) async fn refresh(&self, gateway: &VenueGateway, venues: &[Exchange]) -> Arc<BalanceSnapshot> {
        let mut fetched: Vec<(Exchange, HashMap<Currency, f64>)> = Vec::with_capacity(venues.len());
        for &venue in venues {
            match gateway.balances(venue, &self.currencies).await {
                Ok(balances) => fetched.push((venue, balances)),
                Err(e) => warn!("[{}] Balance refresh failed: {}", venue, e),
            }
        }

        let mut current = self.current.write().await;
        let mut next = BalanceSnapshot::clone(&current);
        for (venue, balances) in fetched {
            next.by_venue.insert(venue, balances);
        }
        next.taken_at_ms = now_ms();

        let next = Arc::new(next);
        *current = next.clone();
        next
    }

    /// Log the current snapshot.
    pub async fn log_snapshot(&self, label: &str) {
        let snapshot = self.snapshot().await;
        info!("{}: {}", label, snapshot);
    }
}
