//! Application configuration.

use crate::error::{AppError, AppResult};
use flare_detector::DetectorConfig;
use flare_lifecycle::{LifecycleConfig, OrderLeg};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Poll loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Send a status notification every N ticks. 0 disables.
    #[serde(default = "default_status_every_ticks")]
    pub status_every_ticks: u64,
    /// Symbol allow-list. Absent or empty means monitor all symbols.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
}

fn default_interval_secs() -> u64 {
    10
}

fn default_status_every_ticks() -> u64 {
    10
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            status_every_ticks: default_status_every_ticks(),
            symbols: None,
        }
    }
}

/// Order and position lifecycle configuration.
///
/// Multipliers and notionals are parallel lists; one leg per pair. A
/// length mismatch is rejected at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    /// Cancel unfilled orders at or past this age (seconds).
    #[serde(default = "default_order_timeout_secs")]
    pub order_timeout_secs: i64,
    /// Close positions held at or past this age (seconds).
    #[serde(default = "default_position_close_timeout_secs")]
    pub position_close_timeout_secs: i64,
    /// Maximum concurrently active order sets across all symbols.
    #[serde(default = "default_max_concurrent_campaigns")]
    pub max_concurrent_campaigns: usize,
    /// Baseline price multipliers, one per leg.
    #[serde(default = "default_price_multipliers")]
    pub price_multipliers: Vec<Decimal>,
    /// USD notionals, one per leg.
    #[serde(default = "default_order_notionals")]
    pub order_notionals: Vec<Decimal>,
}

fn default_order_timeout_secs() -> i64 {
    600
}

fn default_position_close_timeout_secs() -> i64 {
    1800
}

fn default_max_concurrent_campaigns() -> usize {
    1
}

fn default_price_multipliers() -> Vec<Decimal> {
    vec![Decimal::from(3)]
}

fn default_order_notionals() -> Vec<Decimal> {
    vec![Decimal::from(100)]
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            order_timeout_secs: default_order_timeout_secs(),
            position_close_timeout_secs: default_position_close_timeout_secs(),
            max_concurrent_campaigns: default_max_concurrent_campaigns(),
            price_multipliers: default_price_multipliers(),
            order_notionals: default_order_notionals(),
        }
    }
}

/// Exchange endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Info endpoint URL.
    #[serde(default = "default_info_url")]
    pub info_url: String,
    /// Exchange (order action) endpoint URL.
    #[serde(default = "default_exchange_url")]
    pub exchange_url: String,
    /// Wallet address for account queries and order actions.
    pub wallet_address: String,
}

fn default_info_url() -> String {
    "https://api.hyperliquid.xyz/info".to_string()
}

fn default_exchange_url() -> String {
    "https://api.hyperliquid.xyz/exchange".to_string()
}

/// Notification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Discord webhook URL. Absent disables outbound notifications.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log level when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Validate all sections. Called once at startup; any error here
    /// prevents the loop from starting.
    pub fn validate(&self) -> AppResult<()> {
        self.detector.validate().map_err(AppError::Config)?;
        self.lifecycle_config()?;

        if self.poll.interval_secs == 0 {
            return Err(AppError::Config(
                "poll.interval_secs must be positive".to_string(),
            ));
        }

        if self.gateway.wallet_address.is_empty() {
            return Err(AppError::Config(
                "gateway.wallet_address must be set".to_string(),
            ));
        }

        Ok(())
    }

    /// Assemble the lifecycle configuration from the parallel leg lists.
    pub fn lifecycle_config(&self) -> AppResult<LifecycleConfig> {
        let legs = OrderLeg::zip(&self.orders.price_multipliers, &self.orders.order_notionals)?;
        let config = LifecycleConfig {
            order_timeout_secs: self.orders.order_timeout_secs,
            position_close_timeout_secs: self.orders.position_close_timeout_secs,
            max_concurrent_campaigns: self.orders.max_concurrent_campaigns,
            legs,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn minimal_toml() -> &'static str {
        r#"
            [gateway]
            wallet_address = "0xabc123"
        "#
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str(minimal_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.interval_secs, 10);
        assert_eq!(config.orders.order_timeout_secs, 600);
        assert_eq!(config.detector.window_size, 60);
        assert!(config.notify.webhook_url.is_none());
    }

    #[test]
    fn test_full_config_round_trip() {
        let toml_str = r#"
            [poll]
            interval_secs = 5
            status_every_ticks = 20
            symbols = ["BTC", "ETH"]

            [detector]
            window_size = 30
            price_z_threshold = 2.5
            volume_z_threshold = 3.5
            detection_mode = "price_or_volume"
            min_samples = 5
            min_volume_notional = 1000

            [orders]
            order_timeout_secs = 300
            position_close_timeout_secs = 900
            max_concurrent_campaigns = 2
            price_multipliers = [0.5, 3.0]
            order_notionals = [50, 50]

            [gateway]
            wallet_address = "0xabc123"

            [notify]
            webhook_url = "https://discord.com/api/webhooks/1/x"

            [telemetry]
            log_level = "debug"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        let lifecycle = config.lifecycle_config().unwrap();
        assert_eq!(lifecycle.legs.len(), 2);
        assert_eq!(lifecycle.legs[0].multiplier, dec!(0.5));
        assert_eq!(lifecycle.legs[1].notional, dec!(50));
        assert_eq!(config.poll.symbols.as_deref().unwrap().len(), 2);
    }

    #[test]
    fn test_mismatched_leg_lists_fail_validation() {
        let toml_str = r#"
            [orders]
            price_multipliers = [0.5, 3.0]
            order_notionals = [50]

            [gateway]
            wallet_address = "0xabc123"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_fails_validation() {
        let toml_str = r#"
            [poll]
            interval_secs = 0

            [gateway]
            wallet_address = "0xabc123"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_wallet_address_fails_parse() {
        let result: Result<AppConfig, _> = toml::from_str("[poll]\ninterval_secs = 10\n");
        assert!(result.is_err());
    }
}
