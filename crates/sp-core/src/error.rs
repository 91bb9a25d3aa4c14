//! Error types for SpecStat

use thiserror::Error;

/// SpecStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operands of differing shape where identical shapes are required
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Invalid configuration (resolution model, statistic kind, penalty sigma, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
