//! Outbound notifications.
//!
//! Fire-and-forget by contract: the core hands an event to the sink and
//! moves on. Delivery failures are logged and never propagate into
//! trading control flow.

use flare_core::{OrderId, OrderSide, Price, Size, Symbol};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, warn};

/// Embed accent colors (Discord palette).
const COLOR_RED: u32 = 0xED4245;
const COLOR_GREEN: u32 = 0x57F287;
const COLOR_YELLOW: u32 = 0xFEE75C;
const COLOR_BLUE: u32 = 0x5865F2;

/// Events the bot reports outward.
#[derive(Debug, Clone)]
pub enum NoticeEvent {
    /// Bot came up and entered the poll loop.
    BotStarted {
        wallet: String,
        monitored: String,
        detection_mode: String,
        legs: usize,
    },
    /// An anomaly passed all gates and is being acted on.
    Anomaly {
        symbol: Symbol,
        current_price: Price,
        current_volume: Decimal,
        price_z_score: f64,
        volume_z_score: f64,
        baseline_price: Price,
    },
    /// One leg of a campaign was accepted by the exchange.
    OrderPlaced {
        symbol: Symbol,
        side: OrderSide,
        price: Price,
        size: Size,
        multiplier: Decimal,
        notional: Decimal,
        leg: usize,
        leg_count: usize,
    },
    /// An unfilled order was cancelled on timeout.
    OrderCancelled {
        symbol: Symbol,
        order_id: OrderId,
        price: Price,
        multiplier: Decimal,
        age_secs: i64,
    },
    /// A position was closed on timeout.
    PositionClosed {
        symbol: Symbol,
        side: OrderSide,
        size: Size,
        pnl: Option<Decimal>,
        held_secs: i64,
    },
    /// Something went wrong; the loop keeps running.
    ErrorReport { title: String, detail: String },
    /// Periodic heartbeat with account summary.
    Status {
        iteration: u64,
        balance: Option<Decimal>,
        active_orders: usize,
        open_positions: usize,
    },
}

/// Outbound notification sink.
///
/// `send` must not block on delivery and must not fail; implementations
/// spawn or drop as appropriate.
pub trait Notifier: Send + Sync {
    fn send(&self, event: NoticeEvent);
}

// ============================================================================
// Discord webhook notifier
// ============================================================================

/// Posts events as Discord webhook embeds.
pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Notifier for DiscordNotifier {
    fn send(&self, event: NoticeEvent) {
        let payload = json!({"embeds": [embed_for(&event)]});
        let client = self.client.clone();
        let url = self.webhook_url.clone();

        // Delivery happens off the trading path; the loop never awaits it.
        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(status = %response.status(), "Discord webhook rejected notification");
                }
                Ok(_) => debug!("Notification delivered"),
                Err(e) => warn!(error = %e, "Failed to deliver notification"),
            }
        });
    }
}

fn embed_for(event: &NoticeEvent) -> serde_json::Value {
    let timestamp = chrono::Utc::now().to_rfc3339();
    match event {
        NoticeEvent::BotStarted {
            wallet,
            monitored,
            detection_mode,
            legs,
        } => json!({
            "title": "🚀 Bot Started",
            "color": COLOR_BLUE,
            "timestamp": timestamp,
            "fields": [
                {"name": "Wallet", "value": wallet, "inline": true},
                {"name": "Monitoring", "value": monitored, "inline": true},
                {"name": "Mode", "value": detection_mode, "inline": true},
                {"name": "Orders per Anomaly", "value": legs.to_string(), "inline": true},
            ]
        }),
        NoticeEvent::Anomaly {
            symbol,
            current_price,
            current_volume,
            price_z_score,
            volume_z_score,
            baseline_price,
        } => json!({
            "title": "🚨 Anomaly Detected",
            "color": COLOR_RED,
            "timestamp": timestamp,
            "fields": [
                {"name": "Symbol", "value": symbol.to_string(), "inline": true},
                {"name": "Price", "value": format!("${current_price}"), "inline": true},
                {"name": "24h Volume", "value": format!("${current_volume}"), "inline": true},
                {"name": "Price Z-Score", "value": format!("{price_z_score:.2}"), "inline": true},
                {"name": "Volume Z-Score", "value": format!("{volume_z_score:.2}"), "inline": true},
                {"name": "Baseline Price", "value": format!("${baseline_price}"), "inline": true},
            ]
        }),
        NoticeEvent::OrderPlaced {
            symbol,
            side,
            price,
            size,
            multiplier,
            notional,
            leg,
            leg_count,
        } => json!({
            "title": "✅ Order Placed",
            "color": COLOR_GREEN,
            "timestamp": timestamp,
            "fields": [
                {"name": "Symbol", "value": symbol.to_string(), "inline": true},
                {"name": "Side", "value": side.to_string(), "inline": true},
                {"name": "Price", "value": format!("${price}"), "inline": true},
                {"name": "Size", "value": size.to_string(), "inline": true},
                {"name": "Multiplier", "value": format!("{multiplier}x"), "inline": true},
                {"name": "Notional", "value": format!("${notional}"), "inline": true},
                {"name": "Leg", "value": format!("{leg}/{leg_count}"), "inline": true},
            ]
        }),
        NoticeEvent::OrderCancelled {
            symbol,
            order_id,
            price,
            multiplier,
            age_secs,
        } => json!({
            "title": "⏱️ Order Cancelled (Timeout)",
            "color": COLOR_YELLOW,
            "timestamp": timestamp,
            "fields": [
                {"name": "Symbol", "value": symbol.to_string(), "inline": true},
                {"name": "Order ID", "value": order_id.to_string(), "inline": true},
                {"name": "Price", "value": format!("${price}"), "inline": true},
                {"name": "Multiplier", "value": format!("{multiplier}x"), "inline": true},
                {"name": "Age", "value": format!("{age_secs}s"), "inline": true},
            ]
        }),
        NoticeEvent::PositionClosed {
            symbol,
            side,
            size,
            pnl,
            held_secs,
        } => json!({
            "title": "🔴 Position Closed (Timeout)",
            "color": COLOR_YELLOW,
            "timestamp": timestamp,
            "fields": [
                {"name": "Symbol", "value": symbol.to_string(), "inline": true},
                {"name": "Direction", "value": if *side == OrderSide::Buy { "Long" } else { "Short" }, "inline": true},
                {"name": "Size", "value": size.to_string(), "inline": true},
                {"name": "PnL", "value": pnl.map_or("n/a".to_string(), |p| format!("${p}")), "inline": true},
                {"name": "Time Held", "value": format!("{held_secs}s"), "inline": true},
            ]
        }),
        NoticeEvent::ErrorReport { title, detail } => json!({
            "title": format!("❌ {title}"),
            "color": COLOR_RED,
            "timestamp": timestamp,
            "description": detail,
        }),
        NoticeEvent::Status {
            iteration,
            balance,
            active_orders,
            open_positions,
        } => json!({
            "title": "📊 Status Update",
            "color": COLOR_BLUE,
            "timestamp": timestamp,
            "fields": [
                {"name": "Iteration", "value": iteration.to_string(), "inline": true},
                {"name": "Balance", "value": balance.map_or("n/a".to_string(), |b| format!("${b}")), "inline": true},
                {"name": "Active Orders", "value": active_orders.to_string(), "inline": true},
                {"name": "Open Positions", "value": open_positions.to_string(), "inline": true},
            ]
        }),
    }
}

// ============================================================================
// Null and recording sinks
// ============================================================================

/// Sink that drops every event. Used when no webhook is configured.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, _event: NoticeEvent) {}
}

/// Sink that records events for test assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: parking_lot::Mutex<Vec<NoticeEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NoticeEvent> {
        self.events.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, event: NoticeEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_anomaly_embed_shape() {
        let event = NoticeEvent::Anomaly {
            symbol: Symbol::new("DOGE"),
            current_price: Price::new(dec!(0.35)),
            current_volume: dec!(1500000),
            price_z_score: 5.2,
            volume_z_score: 1.1,
            baseline_price: Price::new(dec!(0.30)),
        };

        let embed = embed_for(&event);
        assert_eq!(embed["title"], "🚨 Anomaly Detected");
        assert_eq!(embed["fields"][0]["value"], "DOGE");
        assert_eq!(embed["fields"][3]["value"], "5.20");
    }

    #[test]
    fn test_position_closed_embed_handles_missing_pnl() {
        let event = NoticeEvent::PositionClosed {
            symbol: Symbol::new("BTC"),
            side: OrderSide::Buy,
            size: Size::new(dec!(0.1)),
            pnl: None,
            held_secs: 1800,
        };

        let embed = embed_for(&event);
        assert_eq!(embed["fields"][1]["value"], "Long");
        assert_eq!(embed["fields"][3]["value"], "n/a");
    }

    #[test]
    fn test_recording_notifier_captures_events() {
        let notifier = RecordingNotifier::new();
        notifier.send(NoticeEvent::ErrorReport {
            title: "Order Failed".into(),
            detail: "rejected".into(),
        });

        assert_eq!(notifier.events().len(), 1);
    }
}
