//! Triangle discovery.
//!
//! Walks every ordered pair of symbols that share a currency and looks for
//! a third symbol closing the cycle. Cubic in the catalog size; run once at
//! startup.

use std::collections::HashSet;
use tracing::debug;
use triarb_core::{dedup_key, Currency, Symbol, TriangularPair};

/// Find all distinct triangular pairs in a venue's symbol list.
///
/// Output order follows the input order, and only the first of several
/// equivalent orderings of a cycle is kept.
pub fn find_triangles(symbols: &[Symbol]) -> Vec<TriangularPair> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut triangles = Vec::new();

    for a in symbols {
        for b in symbols {
            if a == b || !a.shares_currency(b) {
                continue;
            }
            for c in symbols {
                if c == a || c == b || !closes_cycle(a, b, c) {
                    continue;
                }

                let key = dedup_key(a, b, c);
                if seen.contains(&key) {
                    continue;
                }

                match TriangularPair::new(a.clone(), b.clone(), c.clone()) {
                    Ok(pair) => {
                        seen.insert(key);
                        triangles.push(pair);
                    }
                    Err(e) => debug!("Skipping candidate {}: {}", key, e),
                }
            }
        }
    }

    triangles
}

/// Both of `c`'s currencies appear exactly twice among the six references.
fn closes_cycle(a: &Symbol, b: &Symbol, c: &Symbol) -> bool {
    if c.base == c.quote {
        return false;
    }
    let refs = [&a.base, &a.quote, &b.base, &b.quote, &c.base, &c.quote];
    let count = |currency: &Currency| refs.iter().filter(|r| **r == currency).count();
    count(&c.base) == 2 && count(&c.quote) == 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use triarb_core::Exchange;

    fn symbols(ids: &[&str]) -> Vec<Symbol> {
        ids.iter()
            .map(|id| Symbol::parse(id, Exchange::Kucoin).unwrap())
            .collect()
    }

    #[test]
    fn test_single_triangle() {
        let triangles = find_triangles(&symbols(&["BTC-USDT", "ETH-USDT", "ETH-BTC"]));
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].to_string(), "BTC-USDT,ETH-USDT,ETH-BTC");
    }

    #[test]
    fn test_multiple_triangles_deduplicated() {
        let list = symbols(&[
            "BTC-USDT", "ETH-USDT", "ETH-BTC", "BNB-USDT", "BNB-BTC", "BNB-ETH", "XRP-USDT",
        ]);
        let triangles = find_triangles(&list);

        // Cycles among {BTC, ETH, BNB, USDT}: choose 3 of 4 currencies
        assert_eq!(triangles.len(), 4);

        let keys: HashSet<String> = triangles.iter().map(TriangularPair::dedup_key).collect();
        assert_eq!(keys.len(), triangles.len());
        assert!(triangles.iter().all(TriangularPair::is_cycle));
    }

    #[test]
    fn test_no_triangle_without_closing_symbol() {
        assert!(find_triangles(&symbols(&["BTC-USDT", "ETH-USDT", "XRP-USDT"])).is_empty());
        assert!(find_triangles(&[]).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let list = symbols(&["ETH-BTC", "BTC-USDT", "ETH-USDT", "BNB-ETH", "BNB-USDT"]);
        assert_eq!(find_triangles(&list), find_triangles(&list));
    }
}
