//! Gateway traits and request/response types.
//!
//! Trait-based abstraction over the exchange so the lifecycle core can be
//! exercised against mock implementations in tests, and the transport can
//! change without touching decision logic.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use flare_core::{MarketSnapshot, OrderId, OrderSide, Price, Size, Symbol};
use rust_decimal::Decimal;

use crate::error::GatewayResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// A limit order placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    /// Add-liquidity-only: rejected rather than matched immediately.
    pub post_only: bool,
}

/// A position close request (market-style, full observed size).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub size: Size,
    /// Constrained to only decrease position size.
    pub reduce_only: bool,
}

/// An open position as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivePosition {
    /// Signed size: positive = long, negative = short.
    pub signed_size: Decimal,
    /// Average entry price, when the exchange reports one.
    pub entry_price: Option<Price>,
    /// Unrealized PnL in USD, when reported.
    pub unrealized_pnl: Option<Decimal>,
}

impl LivePosition {
    pub fn new(signed_size: Decimal) -> Self {
        Self {
            signed_size,
            entry_price: None,
            unrealized_pnl: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.signed_size.is_zero()
    }

    /// Side needed to close this position out.
    pub fn close_side(&self) -> OrderSide {
        if self.signed_size.is_sign_negative() {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    pub fn abs_size(&self) -> Size {
        Size::new(self.signed_size.abs())
    }
}

/// Source of per-tick market snapshots.
pub trait MarketDataFeed: Send + Sync {
    /// Fetch a consistent snapshot of all symbols.
    ///
    /// An empty result is a valid, non-fatal outcome.
    fn fetch_all(&self) -> BoxFuture<'_, GatewayResult<MarketSnapshot>>;
}

/// Order and position operations against the exchange.
pub trait TradingGateway: Send + Sync {
    /// Submit a limit order; resolves to the exchange-assigned order id.
    fn place_limit_order(&self, request: PlaceOrderRequest)
        -> BoxFuture<'_, GatewayResult<OrderId>>;

    /// Cancel a resting order.
    fn cancel_order(&self, symbol: Symbol, order_id: OrderId) -> BoxFuture<'_, GatewayResult<()>>;

    /// Close out a position with a market-style reduce-only order.
    fn close_position(&self, request: CloseOrderRequest) -> BoxFuture<'_, GatewayResult<()>>;

    /// Current open positions keyed by symbol. Zero-size entries are
    /// filtered out by implementations.
    fn open_positions(&self) -> BoxFuture<'_, GatewayResult<HashMap<Symbol, LivePosition>>>;

    /// Account value in USD.
    fn account_value(&self) -> BoxFuture<'_, GatewayResult<Decimal>>;
}

// ============================================================================
// Mock implementations for testing
// ============================================================================

/// Mock market data feed returning a configurable snapshot.
#[derive(Default)]
pub struct MockFeed {
    snapshot: parking_lot::Mutex<MarketSnapshot>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_snapshot(&self, snapshot: MarketSnapshot) {
        *self.snapshot.lock() = snapshot;
    }
}

impl MarketDataFeed for MockFeed {
    fn fetch_all(&self) -> BoxFuture<'_, GatewayResult<MarketSnapshot>> {
        Box::pin(async move { Ok(self.snapshot.lock().clone()) })
    }
}

/// Mock trading gateway for lifecycle tests.
///
/// Records every request and returns queued results, falling back to
/// success (with sequential order ids) when no result is queued.
pub struct MockGateway {
    place_results: parking_lot::Mutex<VecDeque<GatewayResult<OrderId>>>,
    cancel_results: parking_lot::Mutex<VecDeque<GatewayResult<()>>>,
    close_results: parking_lot::Mutex<VecDeque<GatewayResult<()>>>,
    positions: parking_lot::Mutex<HashMap<Symbol, LivePosition>>,
    placed: parking_lot::Mutex<Vec<PlaceOrderRequest>>,
    cancelled: parking_lot::Mutex<Vec<(Symbol, OrderId)>>,
    closed: parking_lot::Mutex<Vec<CloseOrderRequest>>,
    next_oid: AtomicU64,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            place_results: parking_lot::Mutex::new(VecDeque::new()),
            cancel_results: parking_lot::Mutex::new(VecDeque::new()),
            close_results: parking_lot::Mutex::new(VecDeque::new()),
            positions: parking_lot::Mutex::new(HashMap::new()),
            placed: parking_lot::Mutex::new(Vec::new()),
            cancelled: parking_lot::Mutex::new(Vec::new()),
            closed: parking_lot::Mutex::new(Vec::new()),
            next_oid: AtomicU64::new(1),
        }
    }

    /// Queue the result for the next placement; unqueued calls succeed.
    pub fn queue_place_result(&self, result: GatewayResult<OrderId>) {
        self.place_results.lock().push_back(result);
    }

    /// Queue the result for the next cancellation; unqueued calls succeed.
    pub fn queue_cancel_result(&self, result: GatewayResult<()>) {
        self.cancel_results.lock().push_back(result);
    }

    /// Queue the result for the next close; unqueued calls succeed.
    pub fn queue_close_result(&self, result: GatewayResult<()>) {
        self.close_results.lock().push_back(result);
    }

    pub fn set_positions(&self, positions: HashMap<Symbol, LivePosition>) {
        *self.positions.lock() = positions;
    }

    pub fn placed_orders(&self) -> Vec<PlaceOrderRequest> {
        self.placed.lock().clone()
    }

    pub fn cancelled_orders(&self) -> Vec<(Symbol, OrderId)> {
        self.cancelled.lock().clone()
    }

    pub fn close_requests(&self) -> Vec<CloseOrderRequest> {
        self.closed.lock().clone()
    }
}

impl TradingGateway for MockGateway {
    fn place_limit_order(
        &self,
        request: PlaceOrderRequest,
    ) -> BoxFuture<'_, GatewayResult<OrderId>> {
        Box::pin(async move {
            self.placed.lock().push(request);
            match self.place_results.lock().pop_front() {
                Some(result) => result,
                None => Ok(OrderId::new(self.next_oid.fetch_add(1, Ordering::SeqCst))),
            }
        })
    }

    fn cancel_order(&self, symbol: Symbol, order_id: OrderId) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            self.cancelled.lock().push((symbol, order_id));
            self.cancel_results.lock().pop_front().unwrap_or(Ok(()))
        })
    }

    fn close_position(&self, request: CloseOrderRequest) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            self.closed.lock().push(request);
            self.close_results.lock().pop_front().unwrap_or(Ok(()))
        })
    }

    fn open_positions(&self) -> BoxFuture<'_, GatewayResult<HashMap<Symbol, LivePosition>>> {
        Box::pin(async move { Ok(self.positions.lock().clone()) })
    }

    fn account_value(&self) -> BoxFuture<'_, GatewayResult<Decimal>> {
        Box::pin(async move { Ok(Decimal::ZERO) })
    }
}
