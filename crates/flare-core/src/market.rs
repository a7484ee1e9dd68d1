//! Market data types.

use crate::{Price, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One symbol's slice of a market snapshot.
///
/// Produced by the market data feed once per poll tick; the detector
/// consumes price and 24h USD volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSample {
    /// Mark price.
    pub price: Price,
    /// 24h notional volume in USD.
    pub volume_24h: Decimal,
}

impl MarketSample {
    pub fn new(price: Price, volume_24h: Decimal) -> Self {
        Self { price, volume_24h }
    }
}

/// Snapshot of all symbols at one poll tick.
///
/// Ordered map so scans iterate symbols deterministically.
pub type MarketSnapshot = BTreeMap<Symbol, MarketSample>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sample_construction() {
        let sample = MarketSample::new(Price::new(dec!(100.5)), dec!(250000));
        assert_eq!(sample.price, Price::new(dec!(100.5)));
        assert_eq!(sample.volume_24h, dec!(250000));
    }
}
