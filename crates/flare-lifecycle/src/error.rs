//! Error types for flare-lifecycle.

use thiserror::Error;

/// Lifecycle error types.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid lifecycle configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
