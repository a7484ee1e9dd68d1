//! Order lifecycle manager.
//!
//! State machine per symbol:
//! `IDLE -> ORDERS_PLACED -> (FILLED -> POSITION_OPEN) | CANCELLED -> IDLE`,
//! with `POSITION_OPEN -> IDLE` on close. The concurrency cap is a gate,
//! not a queue: anomalies beyond it are dropped for the cycle and may be
//! re-detected on later ticks if conditions persist.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use flare_core::{OrderSide, Size, Symbol};
use flare_detector::AnomalyEvent;
use flare_gateway::{
    CloseOrderRequest, LivePosition, NoticeEvent, Notifier, PlaceOrderRequest, TradingGateway,
};
use flare_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::config::LifecycleConfig;
use crate::error::LifecycleResult;
use crate::state::{ActiveOrder, LifecycleState, TrackedPosition};

/// Owns all in-flight orders and tracked positions and advances their
/// time-boxed lifecycles against the trading gateway.
pub struct OrderLifecycleManager {
    config: LifecycleConfig,
    state: LifecycleState,
    gateway: Arc<dyn TradingGateway>,
    notifier: Arc<dyn Notifier>,
}

impl OrderLifecycleManager {
    /// Create a manager, validating the configuration up front.
    pub fn new(
        config: LifecycleConfig,
        gateway: Arc<dyn TradingGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> LifecycleResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: LifecycleState::new(),
            gateway,
            notifier,
        })
    }

    /// Current tracking state, for orchestration and inspection.
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// True when nothing is in flight anywhere.
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn campaign_count(&self) -> usize {
        self.state.campaign_count()
    }

    /// React to a detected anomaly by placing the configured legs.
    ///
    /// Returns the number of legs accepted by the exchange. A no-op
    /// (symbol busy, cap reached, no baseline) returns 0, as does a
    /// campaign where every leg failed. Legs are placed in configured
    /// order; one leg's failure does not abort the rest, since each leg
    /// is an independent risk unit.
    pub async fn handle_anomaly(&mut self, event: &AnomalyEvent) -> usize {
        let symbol = &event.symbol;

        if self.state.has_active_orders(symbol) {
            debug!(%symbol, "Skipping anomaly, symbol already has active orders");
            return 0;
        }
        if self.state.has_position(symbol) {
            debug!(%symbol, "Skipping anomaly, symbol already has a tracked position");
            return 0;
        }
        if self.state.campaign_count() >= self.config.max_concurrent_campaigns {
            info!(
                %symbol,
                cap = self.config.max_concurrent_campaigns,
                "Skipping anomaly, concurrent campaign cap reached"
            );
            return 0;
        }
        let Some(baseline) = event.baseline_price else {
            warn!(%symbol, "Skipping anomaly, no baseline price recorded yet");
            return 0;
        };

        self.notifier.send(NoticeEvent::Anomaly {
            symbol: symbol.clone(),
            current_price: event.current_price,
            current_volume: event.current_volume,
            price_z_score: event.price_z_score,
            volume_z_score: event.volume_z_score,
            baseline_price: baseline,
        });

        let leg_count = self.config.legs.len();
        let mut placed: Vec<ActiveOrder> = Vec::new();

        for (i, leg) in self.config.legs.iter().enumerate() {
            let target_price = baseline * leg.multiplier;
            if !target_price.is_positive() {
                warn!(%symbol, multiplier = %leg.multiplier, "Skipping leg with non-positive target price");
                continue;
            }

            // Mean reversion: a low multiplier buys below the baseline,
            // a high multiplier sells above it.
            let side = if leg.multiplier < Decimal::ONE {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            };
            let size = Size::new(leg.notional / target_price.inner());

            info!(
                %symbol,
                leg = i + 1,
                leg_count,
                %side,
                price = %target_price,
                %size,
                multiplier = %leg.multiplier,
                notional = %leg.notional,
                "Placing order"
            );

            let request = PlaceOrderRequest {
                symbol: symbol.clone(),
                side,
                price: target_price,
                size,
                post_only: true,
            };

            match self.gateway.place_limit_order(request).await {
                Ok(order_id) => {
                    Metrics::order_placed(symbol.as_str(), &side.to_string());
                    self.notifier.send(NoticeEvent::OrderPlaced {
                        symbol: symbol.clone(),
                        side,
                        price: target_price,
                        size,
                        multiplier: leg.multiplier,
                        notional: leg.notional,
                        leg: i + 1,
                        leg_count,
                    });
                    info!(%symbol, %order_id, leg = i + 1, "Order placed");

                    placed.push(ActiveOrder {
                        order_id,
                        side,
                        price: target_price,
                        size,
                        placed_at: Utc::now(),
                        multiplier: leg.multiplier,
                        notional: leg.notional,
                    });
                }
                Err(e) => {
                    error!(%symbol, leg = i + 1, error = %e, "Failed to place order");
                    Metrics::gateway_error("place_order");
                    self.notifier.send(NoticeEvent::ErrorReport {
                        title: format!("Order {}/{leg_count} Failed", i + 1),
                        detail: format!("{symbol}: {e}"),
                    });
                }
            }
        }

        let placed_count = placed.len();
        if placed_count > 0 {
            // Pre-record the position template so a fill is recognized
            // without an explicit fill event.
            if let Some(position) = TrackedPosition::from_orders(&placed) {
                self.state.positions.insert(symbol.clone(), position);
            }
            self.state.active_orders.insert(symbol.clone(), placed);
            info!(%symbol, placed_count, leg_count, "Campaign active");
        }

        placed_count
    }

    /// Discover fills from exchange-reported positions.
    ///
    /// Any symbol with a live position and an active order set has filled:
    /// its order-set metadata becomes the tracked position (the pre-recorded
    /// template, or one derived now if the template is missing) and the
    /// symbol leaves the active order map.
    pub fn reconcile_fills(&mut self, live: &HashMap<Symbol, LivePosition>) {
        let filled: Vec<Symbol> = self
            .state
            .active_orders
            .keys()
            .filter(|symbol| live.get(*symbol).is_some_and(|p| !p.is_flat()))
            .cloned()
            .collect();

        for symbol in filled {
            let Some(orders) = self.state.active_orders.remove(&symbol) else {
                continue;
            };
            info!(%symbol, "Order filled, tracking position");

            if !self.state.has_position(&symbol) {
                match TrackedPosition::from_orders(&orders) {
                    Some(position) => {
                        self.state.positions.insert(symbol.clone(), position);
                    }
                    None => {
                        warn!(%symbol, "Filled symbol had an empty order set, dropping");
                    }
                }
            }
        }
    }

    /// Cancel orders at or past the order timeout.
    ///
    /// Cancellation failures keep the order for retry on the next tick;
    /// the poll interval is the retry interval. A symbol whose set empties
    /// returns to idle, and its position template is cleared: an order set
    /// that never filled has no position to track.
    pub async fn expire_orders(&mut self, now: DateTime<Utc>) {
        let symbols: Vec<Symbol> = self.state.active_orders.keys().cloned().collect();

        for symbol in symbols {
            let Some(orders) = self.state.active_orders.remove(&symbol) else {
                continue;
            };

            let mut remaining = Vec::new();
            for order in orders {
                let age = order.age_secs(now);
                if age < self.config.order_timeout_secs {
                    remaining.push(order);
                    continue;
                }

                info!(%symbol, order_id = %order.order_id, age, "Cancelling expired order");
                match self
                    .gateway
                    .cancel_order(symbol.clone(), order.order_id)
                    .await
                {
                    Ok(()) => {
                        Metrics::order_cancelled(symbol.as_str());
                        self.notifier.send(NoticeEvent::OrderCancelled {
                            symbol: symbol.clone(),
                            order_id: order.order_id,
                            price: order.price,
                            multiplier: order.multiplier,
                            age_secs: age,
                        });
                        info!(%symbol, order_id = %order.order_id, "Order cancelled");
                    }
                    Err(e) => {
                        error!(%symbol, order_id = %order.order_id, error = %e, "Failed to cancel order, will retry next tick");
                        Metrics::gateway_error("cancel_order");
                        remaining.push(order);
                    }
                }
            }

            if remaining.is_empty() {
                if self.state.positions.remove(&symbol).is_some() {
                    debug!(%symbol, "Cleared position template after all orders expired");
                }
            } else {
                self.state.active_orders.insert(symbol, remaining);
            }
        }
    }

    /// Close positions at or past the position-close timeout.
    ///
    /// The close size is the exchange-reported size from this tick's live
    /// snapshot, never the stale tracker value. A symbol the exchange no
    /// longer reports a position for was closed externally; its tracker
    /// entry is dropped without issuing a close order. Close failures keep
    /// the entry for retry next tick.
    pub async fn expire_positions(
        &mut self,
        now: DateTime<Utc>,
        live: &HashMap<Symbol, LivePosition>,
    ) {
        let symbols: Vec<Symbol> = self.state.positions.keys().cloned().collect();

        for symbol in symbols {
            let Some(tracked) = self.state.positions.get(&symbol) else {
                continue;
            };

            let age = tracked.age_secs(now);
            if age < self.config.position_close_timeout_secs {
                continue;
            }

            info!(%symbol, age, "Position held past timeout, closing");

            let Some(position) = live.get(&symbol).filter(|p| !p.is_flat()) else {
                info!(%symbol, "No live position on exchange, dropping tracker entry");
                self.state.positions.remove(&symbol);
                continue;
            };

            let request = CloseOrderRequest {
                symbol: symbol.clone(),
                side: position.close_side(),
                size: position.abs_size(),
                reduce_only: true,
            };
            let position_side = if position.signed_size.is_sign_positive() {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            };
            let pnl = position.unrealized_pnl;
            let size = position.abs_size();

            match self.gateway.close_position(request).await {
                Ok(()) => {
                    Metrics::position_closed(symbol.as_str());
                    self.notifier.send(NoticeEvent::PositionClosed {
                        symbol: symbol.clone(),
                        side: position_side,
                        size,
                        pnl,
                        held_secs: age,
                    });
                    info!(%symbol, %size, "Position closed");
                    self.state.positions.remove(&symbol);
                }
                Err(e) => {
                    error!(%symbol, error = %e, "Failed to close position, will retry next tick");
                    Metrics::gateway_error("close_position");
                    self.notifier.send(NoticeEvent::ErrorReport {
                        title: "Position Close Failed".to_string(),
                        detail: format!("{symbol}: {e}"),
                    });
                }
            }
        }
    }
}
