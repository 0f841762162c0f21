//! Triangular pairs: three symbols forming a 3-cycle on the currency graph.

use crate::{CoreError, CoreResult, Currency, Symbol};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three symbols whose six currency references contain exactly three
/// distinct currencies, each appearing exactly twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriangularPair {
    pub pair_a: Symbol,
    pub pair_b: Symbol,
    pub pair_c: Symbol,
}

impl TriangularPair {
    /// Create a triangle, validating the cycle invariant.
    pub fn new(pair_a: Symbol, pair_b: Symbol, pair_c: Symbol) -> CoreResult<Self> {
        let pair = Self {
            pair_a,
            pair_b,
            pair_c,
        };
        if !pair.is_cycle() {
            return Err(CoreError::InvalidTriangle(pair.to_string()));
        }
        Ok(pair)
    }

    pub fn symbols(&self) -> [&Symbol; 3] {
        [&self.pair_a, &self.pair_b, &self.pair_c]
    }

    /// Sorted concatenation of the three symbol ids. Permutations of the
    /// same cycle share this key.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.pair_a, &self.pair_b, &self.pair_c)
    }

    /// The three distinct currencies of the cycle, in first-seen order.
    pub fn currencies(&self) -> Vec<Currency> {
        let mut out: Vec<Currency> = Vec::with_capacity(3);
        for symbol in self.symbols() {
            for currency in [&symbol.base, &symbol.quote] {
                if !out.contains(currency) {
                    out.push(currency.clone());
                }
            }
        }
        out
    }

    /// Check the 3-cycle invariant.
    pub fn is_cycle(&self) -> bool {
        let [a, b, c] = self.symbols();
        if a == b || b == c || a == c {
            return false;
        }
        let refs = [&a.base, &a.quote, &b.base, &b.quote, &c.base, &c.quote];
        let currencies = self.currencies();
        currencies.len() == 3
            && currencies
                .iter()
                .all(|cur| refs.iter().filter(|r| **r == cur).count() == 2)
    }
}

impl fmt::Display for TriangularPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.pair_a, self.pair_b, self.pair_c)
    }
}

/// Dedup key for an unordered triple of symbols.
pub fn dedup_key(a: &Symbol, b: &Symbol, c: &Symbol) -> String {
    let mut ids = [a.id(), b.id(), c.id()];
    ids.sort();
    ids.concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Exchange;

    fn sym(id: &str) -> Symbol {
        Symbol::parse(id, Exchange::Kucoin).unwrap()
    }

    #[test]
    fn test_valid_triangle() {
        let pair = TriangularPair::new(sym("BTC-USDT"), sym("ETH-USDT"), sym("ETH-BTC")).unwrap();
        assert!(pair.is_cycle());
        assert_eq!(pair.currencies().len(), 3);
        assert_eq!(pair.to_string(), "BTC-USDT,ETH-USDT,ETH-BTC");
    }

    #[test]
    fn test_invalid_triangle_rejected() {
        // Four currencies
        assert!(TriangularPair::new(sym("BTC-USDT"), sym("ETH-USDT"), sym("XRP-BTC")).is_err());
        // Repeated symbol
        assert!(TriangularPair::new(sym("BTC-USDT"), sym("BTC-USDT"), sym("ETH-BTC")).is_err());
    }

    #[test]
    fn test_dedup_key_is_order_independent() {
        let a = TriangularPair::new(sym("BTC-USDT"), sym("ETH-USDT"), sym("ETH-BTC")).unwrap();
        let b = TriangularPair::new(sym("ETH-BTC"), sym("BTC-USDT"), sym("ETH-USDT")).unwrap();
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key(), "BTC-USDTETH-BTCETH-USDT");
    }
}
