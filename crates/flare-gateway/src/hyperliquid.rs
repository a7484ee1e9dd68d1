//! Hyperliquid REST client.
//!
//! Implements the gateway traits over the exchange's two endpoints:
//! `/info` for market data and account state, `/exchange` for order
//! actions. All prices and sizes travel as decimal strings on the wire.

use std::collections::HashMap;
use std::time::Duration;

use flare_core::{MarketSample, MarketSnapshot, OrderId, OrderSide, Price, Symbol};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::traits::{
    BoxFuture, CloseOrderRequest, LivePosition, MarketDataFeed, PlaceOrderRequest, TradingGateway,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Slippage tolerance for market-style close orders, in basis points.
/// The close is an aggressive IOC limit priced through the mid.
const CLOSE_SLIPPAGE_BPS: i64 = 500;

/// REST client for Hyperliquid.
pub struct HyperliquidClient {
    client: Client,
    info_url: String,
    exchange_url: String,
    wallet_address: String,
}

impl HyperliquidClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `info_url` - Info endpoint (e.g. "https://api.hyperliquid.xyz/info")
    /// * `exchange_url` - Exchange endpoint for order actions
    /// * `wallet_address` - Wallet address used for account queries and actions
    pub fn new(
        info_url: impl Into<String>,
        exchange_url: impl Into<String>,
        wallet_address: impl Into<String>,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            info_url: info_url.into(),
            exchange_url: exchange_url.into(),
            wallet_address: wallet_address.into(),
        })
    }

    async fn post_json(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> GatewayResult<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("Failed to parse response: {e}")))
    }

    /// Submit an order action and return the parsed body.
    async fn post_action(&self, action: serde_json::Value) -> GatewayResult<serde_json::Value> {
        let payload = json!({
            "action": action,
            "address": self.wallet_address,
            "nonce": chrono::Utc::now().timestamp_millis(),
        });
        self.post_json(&self.exchange_url, &payload).await
    }

    /// Fetch full account state (positions + margin summary).
    async fn clearinghouse_state(&self) -> GatewayResult<ClearinghouseState> {
        let body = self
            .post_json(
                &self.info_url,
                &json!({"type": "clearinghouseState", "user": self.wallet_address}),
            )
            .await?;

        serde_json::from_value(body).map_err(|e| {
            GatewayError::MalformedResponse(format!("Failed to parse clearinghouseState: {e}"))
        })
    }

    /// Current mid price for one symbol, from the allMids map.
    async fn mid_price(&self, symbol: &Symbol) -> GatewayResult<Price> {
        let body = self
            .post_json(&self.info_url, &json!({"type": "allMids"}))
            .await?;

        body.get(symbol.as_str())
            .and_then(|px| px.as_str())
            .and_then(|px| px.parse().ok())
            .map(Price::new)
            .ok_or_else(|| {
                GatewayError::MalformedResponse(format!("No mid price for {symbol} in allMids"))
            })
    }
}

impl MarketDataFeed for HyperliquidClient {
    fn fetch_all(&self) -> BoxFuture<'_, GatewayResult<MarketSnapshot>> {
        Box::pin(async move {
            let body = self
                .post_json(&self.info_url, &json!({"type": "metaAndAssetCtxs"}))
                .await?;

            let snapshot = parse_meta_and_ctxs(&body)?;
            debug!(symbols = snapshot.len(), "Fetched market snapshot");
            Ok(snapshot)
        })
    }
}

impl TradingGateway for HyperliquidClient {
    fn place_limit_order(
        &self,
        request: PlaceOrderRequest,
    ) -> BoxFuture<'_, GatewayResult<OrderId>> {
        Box::pin(async move {
            let tif = if request.post_only { "Alo" } else { "Ioc" };
            let action = json!({
                "type": "order",
                "orders": [{
                    "coin": request.symbol.as_str(),
                    "isBuy": request.side == OrderSide::Buy,
                    "px": request.price.to_string(),
                    "sz": request.size.to_string(),
                    "orderType": {"limit": {"tif": tif}},
                    "reduceOnly": false,
                }],
                "grouping": "na",
            });

            let body = self.post_action(action).await?;
            parse_order_ack(&body)
        })
    }

    fn cancel_order(&self, symbol: Symbol, order_id: OrderId) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            let action = json!({
                "type": "cancel",
                "cancels": [{"coin": symbol.as_str(), "oid": order_id.value()}],
            });

            let body = self.post_action(action).await?;
            parse_action_status(&body)
        })
    }

    fn close_position(&self, request: CloseOrderRequest) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            // Market-style close: IOC limit priced through the mid by the
            // slippage allowance so it executes against the book.
            let mid = self.mid_price(&request.symbol).await?;
            let slippage = Decimal::new(CLOSE_SLIPPAGE_BPS, 4);
            let px = match request.side {
                OrderSide::Buy => mid * (Decimal::ONE + slippage),
                OrderSide::Sell => mid * (Decimal::ONE - slippage),
            };

            let action = json!({
                "type": "order",
                "orders": [{
                    "coin": request.symbol.as_str(),
                    "isBuy": request.side == OrderSide::Buy,
                    "px": px.to_string(),
                    "sz": request.size.to_string(),
                    "orderType": {"limit": {"tif": "Ioc"}},
                    "reduceOnly": request.reduce_only,
                }],
                "grouping": "na",
            });

            let body = self.post_action(action).await?;
            parse_action_status(&body)
        })
    }

    fn open_positions(&self) -> BoxFuture<'_, GatewayResult<HashMap<Symbol, LivePosition>>> {
        Box::pin(async move {
            let state = self.clearinghouse_state().await?;
            Ok(parse_positions(&state))
        })
    }

    fn account_value(&self) -> BoxFuture<'_, GatewayResult<Decimal>> {
        Box::pin(async move {
            let state = self.clearinghouse_state().await?;
            let summary = state.margin_summary.ok_or_else(|| {
                GatewayError::MalformedResponse("clearinghouseState missing marginSummary".into())
            })?;
            Ok(summary.account_value.parse()?)
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// clearinghouseState response.
///
/// Endpoint: POST /info with `{"type": "clearinghouseState", "user": "<address>"}`.
#[derive(Debug, Deserialize)]
struct ClearinghouseState {
    #[serde(rename = "marginSummary")]
    margin_summary: Option<MarginSummary>,
    #[serde(rename = "assetPositions", default)]
    asset_positions: Vec<AssetPositionEntry>,
}

#[derive(Debug, Deserialize)]
struct MarginSummary {
    /// Account value in USD, as a decimal string.
    #[serde(rename = "accountValue")]
    account_value: String,
}

#[derive(Debug, Deserialize)]
struct AssetPositionEntry {
    position: AssetPositionData,
}

#[derive(Debug, Deserialize)]
struct AssetPositionData {
    /// Coin identifier (e.g. "BTC").
    coin: String,
    /// Signed position size: positive = long, negative = short.
    szi: String,
    #[serde(rename = "entryPx")]
    entry_px: Option<String>,
    #[serde(rename = "unrealizedPnl")]
    unrealized_pnl: Option<String>,
}

// ============================================================================
// Response parsing
// ============================================================================

fn parse_meta_and_ctxs(body: &serde_json::Value) -> GatewayResult<MarketSnapshot> {
    let parts = body.as_array().filter(|a| a.len() >= 2).ok_or_else(|| {
        GatewayError::MalformedResponse(
            "metaAndAssetCtxs response is not a two-element array".into(),
        )
    })?;

    let universe = parts[0]
        .get("universe")
        .and_then(|u| u.as_array())
        .ok_or_else(|| GatewayError::MalformedResponse("meta response missing universe".into()))?;

    let ctxs = parts[1]
        .as_array()
        .ok_or_else(|| GatewayError::MalformedResponse("asset ctxs is not an array".into()))?;

    let mut snapshot = MarketSnapshot::new();
    for (meta, ctx) in universe.iter().zip(ctxs.iter()) {
        let Some(name) = meta.get("name").and_then(|n| n.as_str()) else {
            continue;
        };
        let (Some(price), Some(volume)) = (
            decimal_field(ctx, "markPx"),
            decimal_field(ctx, "dayNtlVlm"),
        ) else {
            debug!(symbol = name, "Skipping asset with missing markPx/dayNtlVlm");
            continue;
        };

        snapshot.insert(
            Symbol::new(name),
            MarketSample::new(Price::new(price), volume),
        );
    }

    Ok(snapshot)
}

fn parse_positions(state: &ClearinghouseState) -> HashMap<Symbol, LivePosition> {
    let mut positions = HashMap::new();

    for entry in &state.asset_positions {
        let data = &entry.position;
        let signed_size: Decimal = match data.szi.parse() {
            Ok(sz) => sz,
            Err(e) => {
                warn!(coin = %data.coin, error = %e, "Skipping position with unparsable size");
                continue;
            }
        };
        if signed_size.is_zero() {
            continue;
        }

        positions.insert(
            Symbol::new(data.coin.clone()),
            LivePosition {
                signed_size,
                entry_price: data
                    .entry_px
                    .as_deref()
                    .and_then(|px| px.parse().ok())
                    .map(Price::new),
                unrealized_pnl: data.unrealized_pnl.as_deref().and_then(|p| p.parse().ok()),
            },
        );
    }

    positions
}

/// Extract the exchange order id from an order action response.
///
/// Success shape: `{"status":"ok","response":{"data":{"statuses":[{"resting":{"oid":N}}]}}}`
/// with `"filled"` in place of `"resting"` when the order executed
/// immediately, or `{"error":"..."}` per status on rejection.
fn parse_order_ack(body: &serde_json::Value) -> GatewayResult<OrderId> {
    ensure_status_ok(body)?;

    let status = body
        .pointer("/response/data/statuses/0")
        .ok_or_else(|| GatewayError::MalformedResponse("order response missing statuses".into()))?;

    if let Some(err) = status.get("error").and_then(|e| e.as_str()) {
        return Err(GatewayError::Rejected(err.to_string()));
    }

    status
        .pointer("/resting/oid")
        .or_else(|| status.pointer("/filled/oid"))
        .and_then(|oid| oid.as_u64())
        .map(OrderId::new)
        .ok_or_else(|| {
            GatewayError::MalformedResponse("order response missing resting/filled oid".into())
        })
}

/// Check an action response for success, tolerating per-status strings.
fn parse_action_status(body: &serde_json::Value) -> GatewayResult<()> {
    ensure_status_ok(body)?;

    if let Some(status) = body.pointer("/response/data/statuses/0") {
        if let Some(err) = status.get("error").and_then(|e| e.as_str()) {
            return Err(GatewayError::Rejected(err.to_string()));
        }
    }

    Ok(())
}

fn ensure_status_ok(body: &serde_json::Value) -> GatewayResult<()> {
    match body.get("status").and_then(|s| s.as_str()) {
        Some("ok") => Ok(()),
        Some(other) => Err(GatewayError::Rejected(format!(
            "exchange returned status {other}: {body}"
        ))),
        None => Err(GatewayError::MalformedResponse(format!(
            "response missing status: {body}"
        ))),
    }
}

fn decimal_field(value: &serde_json::Value, field: &str) -> Option<Decimal> {
    value.get(field)?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_meta_and_ctxs() {
        let body = json!([
            {"universe": [{"name": "BTC", "szDecimals": 5}, {"name": "ETH", "szDecimals": 4}]},
            [
                {"markPx": "50000.5", "dayNtlVlm": "12000000.0"},
                {"markPx": "3000.25", "dayNtlVlm": "8000000.0"}
            ]
        ]);

        let snapshot = parse_meta_and_ctxs(&body).unwrap();
        assert_eq!(snapshot.len(), 2);

        let btc = &snapshot[&Symbol::new("BTC")];
        assert_eq!(btc.price, Price::new(dec!(50000.5)));
        assert_eq!(btc.volume_24h, dec!(12000000.0));
    }

    #[test]
    fn test_parse_meta_and_ctxs_skips_malformed_entries() {
        let body = json!([
            {"universe": [{"name": "BTC"}, {"name": "BAD"}]},
            [
                {"markPx": "50000", "dayNtlVlm": "1000"},
                {"markPx": "not-a-number", "dayNtlVlm": "1000"}
            ]
        ]);

        let snapshot = parse_meta_and_ctxs(&body).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&Symbol::new("BTC")));
    }

    #[test]
    fn test_parse_meta_and_ctxs_rejects_wrong_shape() {
        assert!(parse_meta_and_ctxs(&json!({"universe": []})).is_err());
        assert!(parse_meta_and_ctxs(&json!([{}])).is_err());
    }

    #[test]
    fn test_parse_order_ack_resting() {
        let body = json!({
            "status": "ok",
            "response": {"data": {"statuses": [{"resting": {"oid": 77123}}]}}
        });

        assert_eq!(parse_order_ack(&body).unwrap(), OrderId::new(77123));
    }

    #[test]
    fn test_parse_order_ack_filled() {
        let body = json!({
            "status": "ok",
            "response": {"data": {"statuses": [{"filled": {"oid": 42, "totalSz": "0.1"}}]}}
        });

        assert_eq!(parse_order_ack(&body).unwrap(), OrderId::new(42));
    }

    #[test]
    fn test_parse_order_ack_error_status() {
        let body = json!({
            "status": "ok",
            "response": {"data": {"statuses": [{"error": "Post only order would have immediately matched"}]}}
        });

        match parse_order_ack(&body) {
            Err(GatewayError::Rejected(msg)) => assert!(msg.contains("Post only")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_order_ack_rejects_non_ok() {
        let body = json!({"status": "err", "response": "Invalid nonce"});
        assert!(matches!(
            parse_order_ack(&body),
            Err(GatewayError::Rejected(_))
        ));
    }

    #[test]
    fn test_parse_action_status_cancel_success() {
        let body = json!({
            "status": "ok",
            "response": {"data": {"statuses": ["success"]}}
        });

        assert!(parse_action_status(&body).is_ok());
    }

    #[test]
    fn test_parse_positions_skips_flat_and_keeps_signed() {
        let state: ClearinghouseState = serde_json::from_value(json!({
            "marginSummary": {"accountValue": "10000.50"},
            "assetPositions": [
                {"position": {"coin": "BTC", "szi": "0.5", "entryPx": "50000", "unrealizedPnl": "25.5"}},
                {"position": {"coin": "ETH", "szi": "-2", "entryPx": "3000"}},
                {"position": {"coin": "SOL", "szi": "0"}}
            ]
        }))
        .unwrap();

        let positions = parse_positions(&state);
        assert_eq!(positions.len(), 2);

        let btc = &positions[&Symbol::new("BTC")];
        assert_eq!(btc.signed_size, dec!(0.5));
        assert_eq!(btc.entry_price, Some(Price::new(dec!(50000))));
        assert_eq!(btc.unrealized_pnl, Some(dec!(25.5)));

        let eth = &positions[&Symbol::new("ETH")];
        assert_eq!(eth.signed_size, dec!(-2));
        assert_eq!(eth.close_side(), flare_core::OrderSide::Buy);
    }

    #[test]
    fn test_margin_summary_account_value() {
        let state: ClearinghouseState = serde_json::from_value(json!({
            "marginSummary": {"accountValue": "186.50"},
            "assetPositions": []
        }))
        .unwrap();

        let value: Decimal = state.margin_summary.unwrap().account_value.parse().unwrap();
        assert_eq!(value, dec!(186.50));
    }
}
