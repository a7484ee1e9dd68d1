//! Prometheus metrics for the flare bot.
//!
//! Tracks the poll loop and lifecycle transitions:
//! - Tick count and scan outcomes
//! - Anomalies detected
//! - Orders placed / cancelled, positions closed
//! - Gateway call failures
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_int_gauge, Counter, CounterVec, Encoder,
    IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Total poll loop iterations.
pub static TICKS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("flare_ticks_total", "Total poll loop iterations").unwrap()
});

/// Total anomalies that passed filtering.
pub static ANOMALIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "flare_anomalies_total",
        "Total anomalies detected",
        &["symbol"]
    )
    .unwrap()
});

/// Total orders accepted by the exchange.
pub static ORDERS_PLACED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "flare_orders_placed_total",
        "Total orders placed",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Total orders cancelled on timeout.
pub static ORDERS_CANCELLED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "flare_orders_cancelled_total",
        "Total orders cancelled on timeout",
        &["symbol"]
    )
    .unwrap()
});

/// Total positions closed on timeout.
pub static POSITIONS_CLOSED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "flare_positions_closed_total",
        "Total positions closed on timeout",
        &["symbol"]
    )
    .unwrap()
});

/// Total failed gateway calls by operation.
pub static GATEWAY_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "flare_gateway_errors_total",
        "Total failed gateway calls",
        &["operation"]
    )
    .unwrap()
});

/// Symbols with an active order set right now.
pub static ACTIVE_ORDER_SETS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "flare_active_order_sets",
        "Symbols with an active order set"
    )
    .unwrap()
});

/// Symbols with a tracked position right now.
pub static TRACKED_POSITIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "flare_tracked_positions",
        "Symbols with a tracked position"
    )
    .unwrap()
});

/// Facade over the metric statics.
pub struct Metrics;

impl Metrics {
    /// Record one poll loop iteration.
    pub fn tick() {
        TICKS_TOTAL.inc();
    }

    /// Record a detected anomaly.
    pub fn anomaly(symbol: &str) {
        ANOMALIES_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record a successful order placement.
    pub fn order_placed(symbol: &str, side: &str) {
        ORDERS_PLACED_TOTAL.with_label_values(&[symbol, side]).inc();
    }

    /// Record a timeout cancellation.
    pub fn order_cancelled(symbol: &str) {
        ORDERS_CANCELLED_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record a timeout close.
    pub fn position_closed(symbol: &str) {
        POSITIONS_CLOSED_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record a failed gateway call.
    pub fn gateway_error(operation: &str) {
        GATEWAY_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }

    /// Update the in-flight gauges.
    pub fn set_in_flight(order_sets: usize, positions: usize) {
        ACTIVE_ORDER_SETS.set(order_sets as i64);
        TRACKED_POSITIONS.set(positions as i64);
    }

    /// Encode the full registry in Prometheus text format.
    pub fn gather() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsEncoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncoding(e.to_string()))
    }
}
