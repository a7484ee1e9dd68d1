//! Lifecycle tracking state.
//!
//! One explicit struct owned by the manager: the per-symbol active order
//! sets and the per-symbol tracked positions. Mutated only by the single
//! loop thread.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flare_core::{OrderId, OrderSide, Price, Size, Symbol};
use rust_decimal::Decimal;

/// One resting order belonging to a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveOrder {
    /// Exchange-assigned identifier.
    pub order_id: OrderId,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    /// When the gateway confirmed placement.
    pub placed_at: DateTime<Utc>,
    /// The leg multiplier this order was derived from.
    pub multiplier: Decimal,
    /// The leg notional this order was derived from.
    pub notional: Decimal,
}

impl ActiveOrder {
    /// Age in whole seconds at `now`.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.placed_at).num_seconds()
    }
}

/// A position being tracked toward its close timeout.
///
/// Recorded optimistically from the order set at placement time, so a
/// later fill is recognized without an explicit fill event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPosition {
    pub opened_at: DateTime<Utc>,
    /// Side of the first leg.
    pub side: OrderSide,
    /// One entry price per leg.
    pub entry_prices: Vec<Price>,
    /// One size per leg.
    pub sizes: Vec<Size>,
    pub total_size: Size,
}

impl TrackedPosition {
    /// Derive a position template from a placed order set.
    ///
    /// Returns `None` for an empty set; callers drop such entries rather
    /// than track something with no legs behind it.
    pub fn from_orders(orders: &[ActiveOrder]) -> Option<Self> {
        let first = orders.first()?;
        let total = orders
            .iter()
            .fold(Decimal::ZERO, |acc, o| acc + o.size.inner());

        Some(Self {
            opened_at: first.placed_at,
            side: first.side,
            entry_prices: orders.iter().map(|o| o.price).collect(),
            sizes: orders.iter().map(|o| o.size).collect(),
            total_size: Size::new(total),
        })
    }

    /// Age in whole seconds at `now`.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.opened_at).num_seconds()
    }
}

/// All lifecycle tracking state, keyed by symbol.
#[derive(Debug, Default)]
pub struct LifecycleState {
    pub(crate) active_orders: HashMap<Symbol, Vec<ActiveOrder>>,
    pub(crate) positions: HashMap<Symbol, TrackedPosition>,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// No active orders and no tracked positions anywhere.
    pub fn is_idle(&self) -> bool {
        self.active_orders.is_empty() && self.positions.is_empty()
    }

    /// Number of symbols with an active order set.
    pub fn campaign_count(&self) -> usize {
        self.active_orders.len()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_active_orders(&self, symbol: &Symbol) -> bool {
        self.active_orders.contains_key(symbol)
    }

    pub fn has_position(&self, symbol: &Symbol) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn active_orders(&self) -> &HashMap<Symbol, Vec<ActiveOrder>> {
        &self.active_orders
    }

    pub fn positions(&self) -> &HashMap<Symbol, TrackedPosition> {
        &self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order(size: Decimal, placed_at: DateTime<Utc>) -> ActiveOrder {
        ActiveOrder {
            order_id: OrderId::new(1),
            side: OrderSide::Buy,
            price: Price::new(dec!(50)),
            size: Size::new(size),
            placed_at,
            multiplier: dec!(0.5),
            notional: dec!(50),
        }
    }

    #[test]
    fn test_position_template_from_orders() {
        let placed_at = Utc::now();
        let orders = vec![
            sample_order(dec!(1.0), placed_at),
            sample_order(dec!(0.25), placed_at),
        ];

        let position = TrackedPosition::from_orders(&orders).unwrap();
        assert_eq!(position.side, OrderSide::Buy);
        assert_eq!(position.total_size, Size::new(dec!(1.25)));
        assert_eq!(position.entry_prices.len(), 2);
        assert_eq!(position.opened_at, placed_at);
    }

    #[test]
    fn test_position_template_from_empty_set() {
        assert!(TrackedPosition::from_orders(&[]).is_none());
    }

    #[test]
    fn test_order_age() {
        let placed_at = Utc::now();
        let order = sample_order(dec!(1), placed_at);

        let now = placed_at + chrono::Duration::seconds(90);
        assert_eq!(order.age_secs(now), 90);
    }

    #[test]
    fn test_state_idle_transitions() {
        let mut state = LifecycleState::new();
        assert!(state.is_idle());

        let symbol = Symbol::new("BTC");
        state
            .active_orders
            .insert(symbol.clone(), vec![sample_order(dec!(1), Utc::now())]);
        assert!(!state.is_idle());
        assert_eq!(state.campaign_count(), 1);
        assert!(state.has_active_orders(&symbol));

        state.active_orders.remove(&symbol);
        assert!(state.is_idle());
    }
}
