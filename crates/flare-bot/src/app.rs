//! Main application orchestration.
//!
//! One cooperative poll loop: fetch a market snapshot, scan it for
//! anomalies (gated globally while a campaign is in flight), hand ranked
//! anomalies to the lifecycle manager, then advance fill reconciliation
//! and the order/position timeouts. The loop never dies from a bad tick;
//! only an explicit stop signal ends it, and only between ticks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use flare_core::MarketSnapshot;
use flare_detector::AnomalyDetector;
use flare_gateway::{
    DiscordNotifier, HyperliquidClient, MarketDataFeed, NoticeEvent, Notifier, NullNotifier,
    TradingGateway,
};
use flare_lifecycle::OrderLifecycleManager;
use flare_telemetry::Metrics;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    detector: AnomalyDetector,
    manager: OrderLifecycleManager,
    feed: Arc<dyn MarketDataFeed>,
    gateway: Arc<dyn TradingGateway>,
    notifier: Arc<dyn Notifier>,
    iteration: u64,
}

impl Application {
    /// Create a new application from validated configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let client = Arc::new(HyperliquidClient::new(
            &config.gateway.info_url,
            &config.gateway.exchange_url,
            &config.gateway.wallet_address,
        )?);

        let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
            Some(url) => Arc::new(DiscordNotifier::new(url)),
            None => {
                info!("No webhook configured, notifications disabled");
                Arc::new(NullNotifier)
            }
        };

        let detector = AnomalyDetector::new(config.detector.clone());
        let manager = OrderLifecycleManager::new(
            config.lifecycle_config()?,
            client.clone(),
            notifier.clone(),
        )?;

        Ok(Self {
            config,
            detector,
            manager,
            feed: client.clone(),
            gateway: client,
            notifier,
            iteration: 0,
        })
    }

    /// Run the poll loop until a stop signal arrives.
    ///
    /// The stop signal is observed between ticks only; an in-flight tick
    /// always completes so tracked state stays consistent.
    pub async fn run(mut self) -> AppResult<()> {
        self.startup().await;

        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.poll.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.iteration += 1;
                    self.run_tick().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(iterations = self.iteration, "Trading bot stopped");
        Ok(())
    }

    async fn startup(&self) {
        let monitored = match &self.config.poll.symbols {
            Some(symbols) if !symbols.is_empty() => format!("{} symbols", symbols.len()),
            _ => "all symbols".to_string(),
        };

        info!(
            wallet = %shorten(&self.config.gateway.wallet_address),
            %monitored,
            mode = ?self.config.detector.detection_mode,
            interval_secs = self.config.poll.interval_secs,
            order_timeout_secs = self.config.orders.order_timeout_secs,
            position_close_timeout_secs = self.config.orders.position_close_timeout_secs,
            max_concurrent_campaigns = self.config.orders.max_concurrent_campaigns,
            legs = self.config.orders.price_multipliers.len(),
            "Starting trading bot"
        );

        self.notifier.send(NoticeEvent::BotStarted {
            wallet: shorten(&self.config.gateway.wallet_address),
            monitored,
            detection_mode: format!("{:?}", self.config.detector.detection_mode),
            legs: self.config.orders.price_multipliers.len(),
        });

        match self.gateway.account_value().await {
            Ok(balance) => info!(%balance, "Account balance"),
            Err(e) => error!(error = %e, "Failed to fetch account balance"),
        }
    }

    /// One tick: fetch, detect, act, expire.
    async fn run_tick(&mut self) {
        Metrics::tick();
        debug!(iteration = self.iteration, "Starting iteration");

        let snapshot = match self.feed.fetch_all().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Failed to fetch market data");
                Metrics::gateway_error("fetch_snapshot");
                self.notifier.send(NoticeEvent::ErrorReport {
                    title: "Market Data Error".to_string(),
                    detail: e.to_string(),
                });
                return;
            }
        };

        if snapshot.is_empty() {
            warn!("No market data received");
            if self.iteration == 1 {
                self.notifier.send(NoticeEvent::ErrorReport {
                    title: "No Market Data".to_string(),
                    detail: "Exchange returned an empty snapshot".to_string(),
                });
            }
            return;
        }

        let snapshot = apply_allow_list(snapshot, self.config.poll.symbols.as_deref());
        if snapshot.is_empty() {
            warn!("No data for target symbols");
            return;
        }

        // One campaign across the whole universe at a time: while any
        // order set or tracked position is in flight, no new anomalies
        // are even considered.
        if self.manager.is_idle() {
            self.scan_and_act(&snapshot).await;
        } else {
            debug!(
                campaigns = self.manager.campaign_count(),
                positions = self.manager.state().position_count(),
                "Skipping anomaly scan, campaign in flight"
            );
        }

        self.advance_lifecycles().await;

        Metrics::set_in_flight(
            self.manager.campaign_count(),
            self.manager.state().position_count(),
        );

        if self.config.poll.status_every_ticks > 0
            && self.iteration % self.config.poll.status_every_ticks == 0
        {
            self.send_status().await;
        }
    }

    /// Scan the snapshot and act on the highest-ranked anomaly.
    ///
    /// Ranked anomalies are offered to the manager one at a time; the
    /// pass stops once the cap is hit or any campaign was placed, so at
    /// most one symbol is acted on per tick.
    async fn scan_and_act(&mut self, snapshot: &MarketSnapshot) {
        let anomalies = self.detector.scan_all(snapshot);
        if anomalies.is_empty() {
            return;
        }

        info!(count = anomalies.len(), "Found anomalies");

        for event in &anomalies {
            if self.manager.campaign_count() >= self.config.orders.max_concurrent_campaigns {
                info!("Max concurrent campaigns reached, skipping remaining anomalies");
                break;
            }

            Metrics::anomaly(event.symbol.as_str());
            let placed = self.manager.handle_anomaly(event).await;
            if placed > 0 {
                break;
            }
        }
    }

    /// Reconcile fills and advance both timeout lifecycles.
    ///
    /// Runs after any placements so a fresh snapshot of exchange-reported
    /// positions backs the fill and close decisions. If the position
    /// query fails, order expiry still advances; close checks wait for
    /// the next tick rather than acting on stale data.
    async fn advance_lifecycles(&mut self) {
        let now = Utc::now();

        match self.gateway.open_positions().await {
            Ok(live) => {
                self.manager.reconcile_fills(&live);
                self.manager.expire_orders(now).await;
                self.manager.expire_positions(now, &live).await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch live positions, advancing order expiry only");
                Metrics::gateway_error("open_positions");
                self.manager.expire_orders(now).await;
            }
        }
    }

    async fn send_status(&self) {
        let balance = self.gateway.account_value().await.ok();

        info!(
            iteration = self.iteration,
            balance = ?balance,
            active_orders = self.manager.campaign_count(),
            open_positions = self.manager.state().position_count(),
            "Status update"
        );

        self.notifier.send(NoticeEvent::Status {
            iteration: self.iteration,
            balance,
            active_orders: self.manager.campaign_count(),
            open_positions: self.manager.state().position_count(),
        });
    }
}

/// Restrict a snapshot to the configured allow-list, if one is set.
fn apply_allow_list(snapshot: MarketSnapshot, allow: Option<&[String]>) -> MarketSnapshot {
    match allow {
        Some(symbols) if !symbols.is_empty() => snapshot
            .into_iter()
            .filter(|(symbol, _)| symbols.iter().any(|s| s == symbol.as_str()))
            .collect(),
        _ => snapshot,
    }
}

/// Last few characters of a wallet address for logs and notifications.
fn shorten(address: &str) -> String {
    let tail = address.len().saturating_sub(8);
    format!("...{}", &address[tail..])
}
