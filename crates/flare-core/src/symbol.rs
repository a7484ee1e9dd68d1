//! Symbol identifier for exchange assets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange coin symbol (e.g. "BTC", "ETH", "DOGE").
///
/// The universe of symbols is discovered at runtime from the market
/// snapshot, so this is a thin string wrapper rather than an index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_display() {
        let symbol = Symbol::new("BTC");
        assert_eq!(symbol.to_string(), "BTC");
        assert_eq!(symbol.as_str(), "BTC");
    }

    #[test]
    fn test_symbol_ordering() {
        let mut symbols = vec![Symbol::new("ETH"), Symbol::new("BTC")];
        symbols.sort();
        assert_eq!(symbols[0], Symbol::new("BTC"));
    }
}
