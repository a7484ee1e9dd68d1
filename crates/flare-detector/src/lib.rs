//! Rolling-statistics anomaly detection.
//!
//! Maintains an independent bounded history of (price, volume) samples per
//! symbol and classifies each new reading against population statistics
//! over that history. A "last known normal" baseline per symbol survives
//! anomalies and is the reference price for order placement.

pub mod config;
pub mod detector;
pub mod error;
pub mod event;
pub mod window;

pub use config::{DetectionMode, DetectorConfig};
pub use detector::{AnomalyDetector, WindowStats};
pub use error::{DetectorError, DetectorResult};
pub use event::{AnomalyEvent, DetectionStatus};
pub use window::SymbolStatsWindow;
