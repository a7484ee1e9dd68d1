//! Error types for flare-gateway.

use thiserror::Error;

/// Gateway error types.
///
/// Everything here is a transient external failure from the core's point
/// of view: logged and retried on the next natural tick, never fatal.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Exchange rejected request: {0}")]
    Rejected(String),

    #[error("Unexpected response shape: {0}")]
    MalformedResponse(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
