//! Exchange and notification gateways.
//!
//! Everything the core calls through narrow interfaces lives here: the
//! market data feed, the trading gateway (order placement, cancellation,
//! position close and query), and the fire-and-forget notification sink.
//! The Hyperliquid REST implementations own the wire formats; the traits
//! are what the detector/lifecycle core sees.

pub mod error;
pub mod hyperliquid;
pub mod notify;
pub mod traits;

pub use error::{GatewayError, GatewayResult};
pub use hyperliquid::HyperliquidClient;
pub use notify::{DiscordNotifier, NoticeEvent, Notifier, NullNotifier, RecordingNotifier};
pub use traits::{
    BoxFuture, CloseOrderRequest, LivePosition, MarketDataFeed, MockFeed, MockGateway,
    PlaceOrderRequest, TradingGateway,
};
