//! Error types for flare-detector.

use thiserror::Error;

/// Detector error types.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for detector operations.
pub type DetectorResult<T> = Result<T, DetectorError>;
