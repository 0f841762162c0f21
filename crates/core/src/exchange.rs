//! Exchange (venue) identifiers.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trading venue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Kucoin,
    Binance,
    Okx,
}

impl Exchange {
    pub fn as_str(self) -> &'static str {
        match self {
            Exchange::Kucoin => "KuCoin",
            Exchange::Binance => "Binance",
            Exchange::Okx => "OKX",
        }
    }

    pub fn all() -> &'static [Exchange] {
        &[Exchange::Kucoin, Exchange::Binance, Exchange::Okx]
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = CoreError;

    /// Case-insensitive; accepts both the display name and the variant name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "kucoin" => Ok(Exchange::Kucoin),
            "binance" => Ok(Exchange::Binance),
            "okx" => Ok(Exchange::Okx),
            _ => Err(CoreError::UnknownExchange(s.to_string())),
        }
    }
}
