//! Anomaly event types.

use chrono::{DateTime, Utc};
use flare_core::{Price, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a detection call had enough history to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    /// Classified against a full statistical window.
    Evaluated,
    /// Fewer than `min_samples` observations; never anomalous.
    InsufficientData,
}

/// Result of classifying one (price, volume) reading for one symbol.
///
/// Fixed-shape record: every field is present on every event, anomalous
/// or not. Created fresh per detection call and never persisted beyond
/// the handling of that call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyEvent {
    /// Symbol the reading belongs to.
    pub symbol: Symbol,
    /// Price of the classified reading.
    pub current_price: Price,
    /// 24h USD volume of the classified reading.
    pub current_volume: Decimal,
    /// Z-score of the price against the window.
    pub price_z_score: f64,
    /// Z-score of the volume against the window.
    pub volume_z_score: f64,
    /// Price z-score exceeded its threshold.
    pub price_anomaly: bool,
    /// Volume z-score exceeded its threshold.
    pub volume_anomaly: bool,
    /// Combined verdict under the configured detection mode.
    pub is_anomaly: bool,
    /// Whether the window held enough samples to classify.
    pub status: DetectionStatus,
    /// Most recent non-anomalous price, if any has been observed.
    pub baseline_price: Option<Price>,
    /// Samples in the window at classification time.
    pub sample_count: usize,
    /// Classification timestamp.
    pub detected_at: DateTime<Utc>,
}

impl AnomalyEvent {
    /// Event for a symbol with too little history to classify.
    pub fn insufficient_data(
        symbol: Symbol,
        current_price: Price,
        current_volume: Decimal,
        baseline_price: Option<Price>,
        sample_count: usize,
    ) -> Self {
        Self {
            symbol,
            current_price,
            current_volume,
            price_z_score: 0.0,
            volume_z_score: 0.0,
            price_anomaly: false,
            volume_anomaly: false,
            is_anomaly: false,
            status: DetectionStatus::InsufficientData,
            baseline_price,
            sample_count,
            detected_at: Utc::now(),
        }
    }

    /// Combined anomaly magnitude used for ranking: |price z| + |volume z|.
    pub fn combined_magnitude(&self) -> f64 {
        self.price_z_score.abs() + self.volume_z_score.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_data_event_is_never_anomalous() {
        let event = AnomalyEvent::insufficient_data(
            Symbol::new("BTC"),
            Price::new(dec!(50000)),
            dec!(1000000),
            None,
            3,
        );

        assert!(!event.is_anomaly);
        assert_eq!(event.status, DetectionStatus::InsufficientData);
        assert_eq!(event.sample_count, 3);
        assert_eq!(event.combined_magnitude(), 0.0);
    }

    #[test]
    fn test_combined_magnitude_uses_absolute_values() {
        let mut event = AnomalyEvent::insufficient_data(
            Symbol::new("ETH"),
            Price::new(dec!(3000)),
            dec!(500000),
            None,
            0,
        );
        event.price_z_score = -4.0;
        event.volume_z_score = 2.5;

        assert_eq!(event.combined_magnitude(), 6.5);
    }
}
