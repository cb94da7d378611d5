//! Error types for the pump twin
//!
//! Degenerate configuration is rejected up front with a descriptive
//! [`ConfigError`]. Missing samples are never errors; they travel as `None`.

use thiserror::Error;

/// Result type alias for pump twin operations
pub type Result<T> = std::result::Result<T, TwinError>;

/// Main error type for pump twin operations
#[derive(Error, Debug)]
pub enum TwinError {
    /// Configuration rejected at initialization
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Filter construction error
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// IO error while loading or saving configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading or saving configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by `TwinConfig::validate`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value must be strictly positive
    #[error("{field} must be > 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    /// Value must not be negative
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// Value must be finite
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    /// Probability outside [0, 1]
    #[error("{field} must be a probability in [0, 1], got {value}")]
    InvalidProbability { field: &'static str, value: f64 },

    /// Inverted range
    #[error("{field}: lower bound {low} exceeds upper bound {high}")]
    InvertedRange {
        field: &'static str,
        low: f64,
        high: f64,
    },

    /// Count must be at least one
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    /// Window can never be active
    #[error("{field}: window {detail} is never active")]
    EmptyWindow { field: &'static str, detail: String },

    /// Step size is not a whole number of milliseconds
    #[error("{field} must be a whole number of milliseconds, got {value} s")]
    SubMillisecond { field: &'static str, value: f64 },

    /// Last step timestamp falls outside the representable range
    #[error("{steps} steps of {dt} s from {epoch} overflow the timestamp range")]
    TimestampOverflow {
        steps: usize,
        dt: f64,
        epoch: String,
    },
}

/// Errors building a scalar Kalman filter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Variance is negative or not finite
    #[error("{name} variance must be finite and >= 0, got {value}")]
    InvalidVariance { name: &'static str, value: f64 },

    /// P0 + R of zero makes the first gain 0/0
    #[error("initial covariance and measurement variance are both zero")]
    Degenerate,
}
