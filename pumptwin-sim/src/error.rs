// Pump Twin Sim - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Errors raised while building or running a generator.

use pumptwin::{ConfigError, FilterError};
use thiserror::Error;

/// Generator error types.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid noise distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),

    #[error("Safety filter error: {0}")]
    Filter(#[from] FilterError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = SimError::from(ConfigError::ZeroCount {
            field: "simulation.steps",
        });
        assert!(err.to_string().contains("simulation.steps"));
    }

    #[test]
    fn test_distribution_error_conversion() {
        let err: SimError = rand_distr::Normal::new(0.0, -1.0).unwrap_err().into();
        assert!(matches!(err, SimError::Distribution(_)));
    }
}
