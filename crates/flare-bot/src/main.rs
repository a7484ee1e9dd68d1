//! Flare anomaly detection trading bot - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Flare anomaly detection trading bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FLARE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > FLARE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("FLARE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = flare_bot::AppConfig::from_file(&config_path)?;

    flare_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting flare-bot v{}", env!("CARGO_PKG_VERSION"));
    info!(config_path = %config_path, "Configuration loaded");

    let app = flare_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
