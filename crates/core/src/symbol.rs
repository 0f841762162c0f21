//! Trading symbols and per-venue symbol catalogs.

use crate::{CoreError, CoreResult, Exchange, SymbolMap};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency code (e.g., "BTC", "USDT").
pub type Currency = CompactString;

/// A tradeable market on a venue, decomposed into base and quote currencies.
///
/// The canonical identifier is `BASE-QUOTE` regardless of how the venue
/// spells the market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub base: Currency,
    pub quote: Currency,
    pub venue: Exchange,
}

impl Symbol {
    pub fn new(base: &str, quote: &str, venue: Exchange) -> Self {
        Self {
            base: CompactString::from(base.to_ascii_uppercase()),
            quote: CompactString::from(quote.to_ascii_uppercase()),
            venue,
        }
    }

    /// Parse a canonical symbol id such as "BTC-USDT", "BTC/USDT" or "BTC_USDT".
    pub fn parse(id: &str, venue: Exchange) -> CoreResult<Self> {
        let mut parts = id.trim().split(|c| c == '-' || c == '/' || c == '_');
        let (Some(base), Some(quote), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CoreError::InvalidSymbol(id.to_string()));
        };

        let (base, quote) = (base.trim(), quote.trim());
        if base.is_empty() || quote.is_empty() || base.eq_ignore_ascii_case(quote) {
            return Err(CoreError::InvalidSymbol(id.to_string()));
        }

        Ok(Self::new(base, quote, venue))
    }

    /// Canonical identifier, e.g. "BTC-USDT".
    pub fn id(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }

    /// Whether this symbol trades the given currency on either side.
    pub fn has(&self, currency: &str) -> bool {
        self.base == currency || self.quote == currency
    }

    /// The currency on the other side of `currency`, if this symbol trades it.
    pub fn counter(&self, currency: &str) -> Option<&Currency> {
        if self.base == currency {
            Some(&self.quote)
        } else if self.quote == currency {
            Some(&self.base)
        } else {
            None
        }
    }

    /// Whether the two symbols have at least one currency in common.
    pub fn shares_currency(&self, other: &Symbol) -> bool {
        other.has(&self.base) || other.has(&self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

/// The set of symbols known to be tradeable on one venue, in listing order.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolCatalog {
    venue: Exchange,
    symbols: Vec<Symbol>,
}

impl SymbolCatalog {
    pub fn new(venue: Exchange, symbols: Vec<Symbol>) -> Self {
        Self { venue, symbols }
    }

    /// Build a catalog from a venue's raw listing, keeping only markets that
    /// also appear in the cross-venue symbol map.
    ///
    /// Listing order is preserved; it becomes the pair-discovery order.
    pub fn from_listing<'a, I>(venue: Exchange, listing: I, map: &SymbolMap) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut symbols: Vec<Symbol> = Vec::new();
        for venue_symbol in listing {
            let Some(canonical) = map.canonical_for(venue, venue_symbol) else {
                continue;
            };
            if let Ok(symbol) = Symbol::parse(canonical, venue) {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
        }
        Self { venue, symbols }
    }

    pub fn venue(&self) -> Exchange {
        self.venue
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All distinct currencies traded in this catalog, in first-seen order.
    pub fn currencies(&self) -> Vec<Currency> {
        let mut out: Vec<Currency> = Vec::new();
        for symbol in &self.symbols {
            for currency in [&symbol.base, &symbol.quote] {
                if !out.contains(currency) {
                    out.push(currency.clone());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_parse() {
        let symbol = Symbol::parse("btc-usdt", Exchange::Kucoin).unwrap();
        assert_eq!(symbol.base, "BTC");
        assert_eq!(symbol.quote, "USDT");
        assert_eq!(symbol.id(), "BTC-USDT");

        assert_eq!(Symbol::parse("ETH/BTC", Exchange::Kucoin).unwrap().id(), "ETH-BTC");
        assert_eq!(Symbol::parse("XRP_USDT", Exchange::Kucoin).unwrap().id(), "XRP-USDT");
    }

    #[test]
    fn test_symbol_parse_invalid() {
        assert!(Symbol::parse("BTCUSDT", Exchange::Kucoin).is_err());
        assert!(Symbol::parse("BTC-", Exchange::Kucoin).is_err());
        assert!(Symbol::parse("BTC-BTC", Exchange::Kucoin).is_err());
        assert!(Symbol::parse("A-B-C", Exchange::Kucoin).is_err());
    }

    #[test]
    fn test_symbol_counter() {
        let symbol = Symbol::new("ETH", "BTC", Exchange::Kucoin);
        assert_eq!(symbol.counter("ETH").map(|c| c.as_str()), Some("BTC"));
        assert_eq!(symbol.counter("BTC").map(|c| c.as_str()), Some("ETH"));
        assert_eq!(symbol.counter("USDT"), None);
        assert!(symbol.has("BTC"));
        assert!(!symbol.has("USDT"));
    }

    #[test]
    fn test_catalog_from_listing_filters_unmapped() {
        let mut map = SymbolMap::default();
        map.insert("BTC-USDT", Exchange::Kucoin, "BTC-USDT");
        map.insert("ETH-USDT", Exchange::Kucoin, "ETH-USDT");
        map.insert("ETH-BTC", Exchange::Binance, "ETHBTC");

        let listing = ["ETH-USDT", "DOGE-USDT", "BTC-USDT", "ETH-BTC"];
        let catalog = SymbolCatalog::from_listing(Exchange::Kucoin, listing, &map);

        let ids: Vec<String> = catalog.symbols().iter().map(Symbol::id).collect();
        // ETH-BTC is mapped only for Binance, DOGE-USDT not at all
        assert_eq!(ids, vec!["ETH-USDT".to_string(), "BTC-USDT".to_string()]);
        assert_eq!(catalog.venue(), Exchange::Kucoin);
    }

    #[test]
    fn test_catalog_currencies() {
        let catalog = SymbolCatalog::new(
            Exchange::Kucoin,
            vec![
                Symbol::new("BTC", "USDT", Exchange::Kucoin),
                Symbol::new("ETH", "USDT", Exchange::Kucoin),
                Symbol::new("ETH", "BTC", Exchange::Kucoin),
            ],
        );
        let currencies = catalog.currencies();
        let names: Vec<&str> = currencies.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["BTC", "USDT", "ETH"]);
    }
}
