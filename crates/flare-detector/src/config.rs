//! Detector configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which z-score flags constitute an anomaly.
///
/// A pure selector over the price/volume flags; it does not change how
/// the z-scores themselves are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Only the price z-score is considered.
    PriceOnly,
    /// Only the volume z-score is considered.
    #[default]
    VolumeOnly,
    /// Both must independently exceed their thresholds.
    PriceAndVolume,
    /// Either flag suffices.
    PriceOrVolume,
}

impl DetectionMode {
    /// Combine the two per-dimension flags under this mode.
    pub fn combine(&self, price_anomaly: bool, volume_anomaly: bool) -> bool {
        match self {
            Self::PriceOnly => price_anomaly,
            Self::VolumeOnly => volume_anomaly,
            Self::PriceAndVolume => price_anomaly && volume_anomaly,
            Self::PriceOrVolume => price_anomaly || volume_anomaly,
        }
    }
}

/// Configuration for rolling-statistics anomaly detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Samples of history kept per symbol.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Z-score threshold for price anomalies.
    #[serde(default = "default_z_threshold")]
    pub price_z_threshold: f64,
    /// Z-score threshold for volume anomalies.
    #[serde(default = "default_z_threshold")]
    pub volume_z_threshold: f64,
    /// Flag combination mode.
    #[serde(default)]
    pub detection_mode: DetectionMode,
    /// Minimum samples before classification is attempted.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Symbols below this 24h USD volume are not scanned at all.
    #[serde(default)]
    pub min_volume_notional: Decimal,
}

fn default_window_size() -> usize {
    60
}

fn default_z_threshold() -> f64 {
    3.0
}

fn default_min_samples() -> usize {
    10
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            price_z_threshold: default_z_threshold(),
            volume_z_threshold: default_z_threshold(),
            detection_mode: DetectionMode::default(),
            min_samples: default_min_samples(),
            min_volume_notional: Decimal::ZERO,
        }
    }
}

impl DetectorConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be positive".to_string());
        }

        if self.min_samples == 0 {
            return Err("min_samples must be positive".to_string());
        }

        if self.min_samples > self.window_size {
            return Err(format!(
                "min_samples ({}) must not exceed window_size ({})",
                self.min_samples, self.window_size
            ));
        }

        if self.price_z_threshold < 0.0 || self.volume_z_threshold < 0.0 {
            return Err("z-score thresholds must be non-negative".to_string());
        }

        if self.min_volume_notional.is_sign_negative() {
            return Err(format!(
                "min_volume_notional ({}) must be non-negative",
                self.min_volume_notional
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DetectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detection_mode, DetectionMode::VolumeOnly);
    }

    #[test]
    fn test_mode_combinations() {
        assert!(DetectionMode::PriceOnly.combine(true, false));
        assert!(!DetectionMode::PriceOnly.combine(false, true));
        assert!(DetectionMode::VolumeOnly.combine(false, true));
        assert!(!DetectionMode::PriceAndVolume.combine(true, false));
        assert!(DetectionMode::PriceAndVolume.combine(true, true));
        assert!(DetectionMode::PriceOrVolume.combine(true, false));
        assert!(!DetectionMode::PriceOrVolume.combine(false, false));
    }

    #[test]
    fn test_validate_min_samples_exceeds_window() {
        let config = DetectorConfig {
            window_size: 5,
            min_samples: 10,
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("must not exceed"));
    }

    #[test]
    fn test_validate_zero_window() {
        let config = DetectorConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_negative_threshold() {
        let config = DetectorConfig {
            price_z_threshold: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_serde_names() {
        let mode: DetectionMode = serde_json::from_str("\"price_or_volume\"").unwrap();
        assert_eq!(mode, DetectionMode::PriceOrVolume);
    }
}
