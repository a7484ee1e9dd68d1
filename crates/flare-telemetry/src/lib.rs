//! Prometheus metrics and structured logging for flare.
//!
//! - Prometheus counters/gauges for ticks, anomalies, and lifecycle
//!   transitions
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
