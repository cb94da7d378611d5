//! # Pump Twin
//!
//! Digital twin of a hydraulic pump for prototyping predictive-maintenance
//! anomaly detection.
//!
//! This crate holds the pieces every stage shares:
//!
//! - **Twin model**: state transition `fx` and measurement `hx`
//! - **Configuration**: every constant, probability and window, validated up front
//! - **Scalar Kalman filter**: the per-channel estimator of the monitor
//! - **Domain types**: state, control input, measurement, dataset rows
//!
//! Data generation lives in `pumptwin-sim`, monitoring in `pumptwin-monitor`.
//!
//! ## Quick Start
//!
//! ```rust
//! use pumptwin::{ControlInput, TwinConfig, TwinModel, TwinState};
//!
//! let config = TwinConfig::default();
//! config.validate().unwrap();
//!
//! let model = TwinModel::new(config.plant.clone());
//! let u = ControlInput::new(24.0, 1.0, 0.8);
//!
//! let mut x = TwinState::default();
//! for _ in 0..100 {
//!     x = model.fx(&x, &u, config.simulation.dt);
//! }
//! let y = model.hx(&x, &u);
//! assert!(y.flow > 0.0);
//! ```
//!
//! ## Modules
//!
//! - [`model`]: state update and measurement functions
//! - [`config`]: configuration groups and validation
//! - [`kalman`]: scalar Kalman filter
//! - [`types`]: shared domain types
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod kalman;
pub mod model;
pub mod types;

// Re-exports for convenient access
pub use config::{
    AnomalyConfig, AnomalyOverride, AnomalyProbabilities, KalmanParams, MonitorConfig,
    NoiseConfig, PlantParams, ProfileConfig, SafetyLimits, SimulationConfig, Termination,
    TwinConfig, Window,
};
pub use error::{ConfigError, FilterError, Result, TwinError};
pub use kalman::ScalarKalman;
pub use model::{cavitation_factor, saturate, TwinModel};
pub use types::{Channel, ControlInput, DatasetRow, Labels, Measurement, TwinState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timestamp format used in dataset files.
///
/// Millisecond resolution; `TwinConfig::validate` only accepts step sizes
/// that are whole milliseconds, so written timestamps read back exactly.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
