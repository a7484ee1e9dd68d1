//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] flare_gateway::GatewayError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] flare_lifecycle::LifecycleError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] flare_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
