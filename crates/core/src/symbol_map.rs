//! Cross-venue symbol mapping.
//!
//! The same market is spelled differently on each venue ("BTC-USDT" on
//! KuCoin, "BTCUSDT" on Binance). The map is keyed by the canonical id and
//! lists, per venue, the venue-specific symbol.

use crate::Exchange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolMap {
    entries: BTreeMap<String, BTreeMap<Exchange, String>>,
}

impl SymbolMap {
    /// Add or replace the venue-specific spelling of a canonical symbol.
    pub fn insert(&mut self, canonical: &str, venue: Exchange, venue_symbol: &str) {
        self.entries
            .entry(canonical.to_ascii_uppercase())
            .or_default()
            .insert(venue, venue_symbol.to_string());
    }

    /// Builder-style variant of [`SymbolMap::insert`].
    pub fn with(mut self, canonical: &str, venue: Exchange, venue_symbol: &str) -> Self {
        self.insert(canonical, venue, venue_symbol);
        self
    }

    /// The venue-specific symbol for a canonical id, if the venue lists it.
    pub fn venue_symbol(&self, canonical: &str, venue: Exchange) -> Option<&str> {
        self.entries
            .get(canonical)
            .and_then(|venues| venues.get(&venue))
            .map(String::as_str)
    }

    /// Reverse lookup: canonical id for a venue-specific symbol.
    pub fn canonical_for(&self, venue: Exchange, venue_symbol: &str) -> Option<&str> {
        self.entries.iter().find_map(|(canonical, venues)| {
            venues
                .get(&venue)
                .filter(|s| s.eq_ignore_ascii_case(venue_symbol))
                .map(|_| canonical.as_str())
        })
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.entries.contains_key(canonical)
    }

    /// Venues that list the canonical symbol.
    pub fn venues_for(&self, canonical: &str) -> Vec<Exchange> {
        self.entries
            .get(canonical)
            .map(|venues| venues.keys().copied().collect())
            .unwrap_or_default()
    }

    /// All (canonical, venue symbol) pairs listed for a venue.
    pub fn for_venue(&self, venue: Exchange) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(canonical, venues)| {
                venues.get(&venue).map(|s| (canonical.as_str(), s.as_str()))
            })
            .collect()
    }

    pub fn canonicals(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
