//! Per-symbol anomaly detector.
//!
//! Classification always runs against the window state *before* the new
//! sample is admitted, and the last-normal baseline only moves forward on
//! samples that classified as normal. Without that ordering an anomaly
//! would poison its own baseline.

use std::collections::HashMap;

use flare_core::{MarketSnapshot, Price, Symbol};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::event::{AnomalyEvent, DetectionStatus};
use crate::window::SymbolStatsWindow;

/// Rolling-statistics anomaly detector over many symbols.
///
/// Windows are created lazily on first observation of a symbol and live
/// for the process lifetime (or until an explicit `reset`).
pub struct AnomalyDetector {
    config: DetectorConfig,
    windows: HashMap<Symbol, SymbolStatsWindow>,
    last_normal: HashMap<Symbol, Price>,
}

impl AnomalyDetector {
    /// Create a detector with the given configuration.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
            last_normal: HashMap::new(),
        }
    }

    /// Classify one reading against the symbol's current window.
    ///
    /// Pure with respect to detector state: history and baseline are not
    /// touched. Symbols with fewer than `min_samples` observations get a
    /// non-anomalous event tagged `InsufficientData`.
    pub fn detect(&self, symbol: &Symbol, price: Price, volume: Decimal) -> AnomalyEvent {
        let baseline_price = self.last_normal.get(symbol).copied();

        let window = match self.windows.get(symbol) {
            Some(w) if w.sample_count() >= self.config.min_samples => w,
            other => {
                let sample_count = other.map_or(0, SymbolStatsWindow::sample_count);
                return AnomalyEvent::insufficient_data(
                    symbol.clone(),
                    price,
                    volume,
                    baseline_price,
                    sample_count,
                );
            }
        };

        let price_z_score = z_score(
            price.to_f64(),
            window.mean_price(),
            window.std_price(),
            self.config.price_z_threshold,
        );
        let volume_z_score = z_score(
            volume.to_f64().unwrap_or(0.0),
            window.mean_volume(),
            window.std_volume(),
            self.config.volume_z_threshold,
        );

        let price_anomaly = exceeds(price_z_score, self.config.price_z_threshold);
        let volume_anomaly = exceeds(volume_z_score, self.config.volume_z_threshold);
        let is_anomaly = self
            .config
            .detection_mode
            .combine(price_anomaly, volume_anomaly);

        AnomalyEvent {
            symbol: symbol.clone(),
            current_price: price,
            current_volume: volume,
            price_z_score,
            volume_z_score,
            price_anomaly,
            volume_anomaly,
            is_anomaly,
            status: DetectionStatus::Evaluated,
            baseline_price,
            sample_count: window.sample_count(),
            detected_at: chrono::Utc::now(),
        }
    }

    /// Commit one reading into the symbol's history.
    ///
    /// The reading is classified against the pre-push window; the baseline
    /// advances only when that classification found no anomaly (an
    /// insufficient-data window counts as normal). The sample itself is
    /// always admitted.
    pub fn observe(&mut self, symbol: &Symbol, price: Price, volume: Decimal) {
        let event = self.detect(symbol, price, volume);
        if !event.is_anomaly {
            self.last_normal.insert(symbol.clone(), price);
        }

        let window = self
            .windows
            .entry(symbol.clone())
            .or_insert_with(|| SymbolStatsWindow::new(self.config.window_size));
        window.push(price.to_f64(), volume.to_f64().unwrap_or(0.0));
    }

    /// Scan a full market snapshot: detect then observe every eligible
    /// symbol, returning only the anomalous events, most extreme first.
    ///
    /// Eligibility: positive price and 24h volume at or above the
    /// configured notional floor. Ranking is by combined z-score magnitude
    /// so that the most extreme anomaly is acted on first when only a
    /// limited number can be handled per cycle.
    pub fn scan_all(&mut self, snapshot: &MarketSnapshot) -> Vec<AnomalyEvent> {
        let mut anomalies = Vec::new();

        for (symbol, sample) in snapshot {
            if !sample.price.is_positive() || sample.volume_24h < self.config.min_volume_notional {
                continue;
            }

            let event = self.detect(symbol, sample.price, sample.volume_24h);
            self.observe(symbol, sample.price, sample.volume_24h);

            if event.is_anomaly {
                debug!(
                    symbol = %event.symbol,
                    price_z = event.price_z_score,
                    volume_z = event.volume_z_score,
                    "Anomaly detected"
                );
                anomalies.push(event);
            }
        }

        anomalies.sort_by(|a, b| b.combined_magnitude().total_cmp(&a.combined_magnitude()));
        anomalies
    }

    /// Most recent price that classified as normal for the symbol.
    pub fn last_normal_price(&self, symbol: &Symbol) -> Option<Price> {
        self.last_normal.get(symbol).copied()
    }

    /// Diagnostic snapshot of a symbol's window statistics.
    pub fn statistics(&self, symbol: &Symbol) -> Option<WindowStats> {
        let window = self.windows.get(symbol)?;
        if window.is_empty() {
            return None;
        }

        Some(WindowStats {
            sample_count: window.sample_count(),
            price_mean: window.mean_price(),
            price_std: window.std_price(),
            price_min: window.min_price(),
            price_max: window.max_price(),
            volume_mean: window.mean_volume(),
            volume_std: window.std_volume(),
        })
    }

    /// Drop all historical state.
    pub fn reset(&mut self) {
        self.windows.clear();
        self.last_normal.clear();
        debug!("Detector reset, all historical data cleared");
    }

    /// Get current configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

/// Window statistics for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub sample_count: usize,
    pub price_mean: f64,
    pub price_std: f64,
    pub price_min: f64,
    pub price_max: f64,
    pub volume_mean: f64,
    pub volume_std: f64,
}

/// Z-score of `value` against (`mean`, `std`).
///
/// A zero-std window has no variation: matching values score 0. A
/// non-matching value against a zero-std window scores 0 as well, except
/// under a zero threshold where any deviation must flag, so a sentinel
/// 1.0 is returned.
fn z_score(value: f64, mean: f64, std: f64, threshold: f64) -> f64 {
    if std > 0.0 {
        (value - mean) / std
    } else if value != mean && threshold == 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Threshold comparison. Strictly greater, except a zero threshold uses
/// `>=` — a strict `>` against zero would never fire.
fn exceeds(z: f64, threshold: f64) -> bool {
    if threshold == 0.0 {
        z.abs() >= threshold
    } else {
        z.abs() > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionMode;
    use flare_core::MarketSample;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn price_only_config(window_size: usize, threshold: f64, min_samples: usize) -> DetectorConfig {
        DetectorConfig {
            window_size,
            price_z_threshold: threshold,
            volume_z_threshold: threshold,
            detection_mode: DetectionMode::PriceOnly,
            min_samples,
            min_volume_notional: Decimal::ZERO,
        }
    }

    fn feed(detector: &mut AnomalyDetector, symbol: &Symbol, prices: &[i64]) {
        for p in prices {
            detector.observe(symbol, Price::new(Decimal::from(*p)), dec!(5000));
        }
    }

    #[test]
    fn test_insufficient_data_never_anomalous() {
        let detector = {
            let mut d = AnomalyDetector::new(price_only_config(10, 3.0, 5));
            let symbol = Symbol::new("BTC");
            feed(&mut d, &symbol, &[100, 101, 99]);
            d
        };

        // 3 samples < min_samples 5: even a wild value is not anomalous.
        let event = detector.detect(&Symbol::new("BTC"), Price::new(dec!(99999)), dec!(5000));
        assert!(!event.is_anomaly);
        assert_eq!(event.status, DetectionStatus::InsufficientData);
        assert_eq!(event.sample_count, 3);
    }

    #[test]
    fn test_zero_std_positive_threshold_never_fires() {
        let mut detector = AnomalyDetector::new(price_only_config(10, 3.0, 3));
        let symbol = Symbol::new("DOGE");
        feed(&mut detector, &symbol, &[100, 100, 100, 100]);

        let event = detector.detect(&symbol, Price::new(dec!(250)), dec!(5000));
        assert!(!event.is_anomaly);
        assert_eq!(event.price_z_score, 0.0);
    }

    #[test]
    fn test_zero_std_zero_threshold_flags_any_change() {
        let mut detector = AnomalyDetector::new(price_only_config(10, 0.0, 3));
        let symbol = Symbol::new("DOGE");
        feed(&mut detector, &symbol, &[100, 100, 100, 100]);

        let event = detector.detect(&symbol, Price::new(dec!(101)), dec!(5000));
        assert!(event.is_anomaly);
        assert!(event.price_anomaly);
        assert_eq!(event.price_z_score, 1.0);
    }

    #[test]
    fn test_spike_scenario() {
        // window_size=5, threshold=3.0, min_samples=3,
        // history [100, 101, 99, 100, 100], probe 200.
        let mut detector = AnomalyDetector::new(price_only_config(5, 3.0, 3));
        let symbol = Symbol::new("SOL");
        feed(&mut detector, &symbol, &[100, 101, 99, 100, 100]);

        let event = detector.detect(&symbol, Price::new(dec!(200)), dec!(5000));
        assert!(event.is_anomaly);
        assert!(event.price_anomaly);
        // mean = 100, population std = sqrt(0.4) ~ 0.632 -> z ~ 158
        assert!(event.price_z_score > 100.0);
        assert_eq!(event.sample_count, 5);
    }

    #[test]
    fn test_baseline_not_updated_by_anomalous_observe() {
        let mut detector = AnomalyDetector::new(price_only_config(5, 3.0, 3));
        let symbol = Symbol::new("SOL");
        feed(&mut detector, &symbol, &[100, 101, 99, 100, 100]);
        assert_eq!(detector.last_normal_price(&symbol), Some(Price::new(dec!(100))));

        // Anomalous sample enters history but never becomes the baseline.
        detector.observe(&symbol, Price::new(dec!(200)), dec!(5000));
        assert_eq!(detector.last_normal_price(&symbol), Some(Price::new(dec!(100))));
    }

    #[test]
    fn test_baseline_advances_on_normal_observe() {
        let mut detector = AnomalyDetector::new(price_only_config(10, 3.0, 3));
        let symbol = Symbol::new("ETH");
        feed(&mut detector, &symbol, &[100, 101, 99, 100]);

        detector.observe(&symbol, Price::new(dec!(101)), dec!(5000));
        assert_eq!(detector.last_normal_price(&symbol), Some(Price::new(dec!(101))));
    }

    #[test]
    fn test_no_baseline_before_first_observation() {
        let detector = AnomalyDetector::new(price_only_config(10, 3.0, 3));
        assert!(detector.last_normal_price(&Symbol::new("BTC")).is_none());
    }

    #[test]
    fn test_scan_all_ranks_by_combined_magnitude() {
        let mut detector = AnomalyDetector::new(price_only_config(5, 3.0, 3));
        let a = Symbol::new("AAA");
        let b = Symbol::new("BBB");
        feed(&mut detector, &a, &[100, 101, 99, 100, 100]);
        feed(&mut detector, &b, &[100, 101, 99, 100, 100]);

        let mut snapshot: MarketSnapshot = BTreeMap::new();
        // Same history, BBB deviates twice as far: it must rank first.
        snapshot.insert(a.clone(), MarketSample::new(Price::new(dec!(105)), dec!(5000)));
        snapshot.insert(b.clone(), MarketSample::new(Price::new(dec!(110)), dec!(5000)));

        let anomalies = detector.scan_all(&snapshot);
        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].symbol, b);
        assert_eq!(anomalies[1].symbol, a);
        assert!(anomalies[0].combined_magnitude() > anomalies[1].combined_magnitude());
    }

    #[test]
    fn test_scan_all_filters_low_volume_and_zero_price() {
        let config = DetectorConfig {
            min_volume_notional: dec!(1000),
            ..price_only_config(5, 3.0, 3)
        };
        let mut detector = AnomalyDetector::new(config);
        let thin = Symbol::new("THIN");
        let dead = Symbol::new("DEAD");

        let mut snapshot: MarketSnapshot = BTreeMap::new();
        snapshot.insert(thin.clone(), MarketSample::new(Price::new(dec!(100)), dec!(999)));
        snapshot.insert(dead.clone(), MarketSample::new(Price::ZERO, dec!(50000)));

        let anomalies = detector.scan_all(&snapshot);
        assert!(anomalies.is_empty());
        // Filtered symbols must not even accumulate history.
        assert!(detector.statistics(&thin).is_none());
        assert!(detector.statistics(&dead).is_none());
    }

    #[test]
    fn test_scan_all_commits_history() {
        let mut detector = AnomalyDetector::new(price_only_config(5, 3.0, 3));
        let symbol = Symbol::new("BTC");

        let mut snapshot: MarketSnapshot = BTreeMap::new();
        snapshot.insert(
            symbol.clone(),
            MarketSample::new(Price::new(dec!(50000)), dec!(1000000)),
        );

        for _ in 0..3 {
            detector.scan_all(&snapshot);
        }

        let stats = detector.statistics(&symbol).unwrap();
        assert_eq!(stats.sample_count, 3);
        assert_eq!(stats.price_mean, 50000.0);
    }

    #[test]
    fn test_volume_mode_ignores_price_flag() {
        let config = DetectorConfig {
            detection_mode: DetectionMode::VolumeOnly,
            ..price_only_config(5, 3.0, 3)
        };
        let mut detector = AnomalyDetector::new(config);
        let symbol = Symbol::new("ARB");
        // Varied prices, constant volume.
        feed(&mut detector, &symbol, &[100, 101, 99, 100, 100]);

        // Price spike alone must not fire in volume-only mode.
        let event = detector.detect(&symbol, Price::new(dec!(200)), dec!(5000));
        assert!(event.price_anomaly);
        assert!(!event.volume_anomaly);
        assert!(!event.is_anomaly);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut detector = AnomalyDetector::new(price_only_config(5, 3.0, 3));
        let symbol = Symbol::new("BTC");
        feed(&mut detector, &symbol, &[100, 100, 100]);

        detector.reset();
        assert!(detector.statistics(&symbol).is_none());
        assert!(detector.last_normal_price(&symbol).is_none());
    }
}
