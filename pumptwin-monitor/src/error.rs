// Pump Twin Monitor - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Monitor error types.

use pumptwin::{ConfigError, FilterError};
use thiserror::Error;

/// Errors raised by the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rows out of order: step {step} after step {previous}")]
    OutOfOrder { previous: usize, step: usize },

    #[error("Channel worker for {channel} panicked")]
    WorkerPanicked { channel: pumptwin::Channel },
}

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_display() {
        let err = MonitorError::OutOfOrder {
            previous: 9,
            step: 4,
        };
        assert_eq!(err.to_string(), "Rows out of order: step 4 after step 9");
    }
}
