// Pump Twin Sim - Synthetic dataset generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Pump Twin Sim
//!
//! Synthetic sensor datasets from the hydraulic pump digital twin.
//!
//! The generator drives the twin model with a control input profile and
//! passes every measurement through a realistic sensor chain:
//!
//! - **Input profile**: voltage ramp, load and valve cycles, surge, load
//!   bursts and a mid-run valve fault
//! - **Shared drift**: slow calibration drift common to the continuous channels
//! - **Sensor noise**: independent Gaussian noise per channel
//! - **Anomaly injection**: dropout, spikes and sticky drift, with labels
//! - **Safety stop**: optional early stop on filtered overspeed or overtemperature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pumptwin::TwinConfig;
//! use pumptwin_sim::generate;
//!
//! let config = TwinConfig::default().with_seed(42);
//! let report = generate(&config).unwrap();
//!
//! report.dataset.to_csv("generated_run_3000steps.csv").unwrap();
//! ```

pub mod anomaly;
pub mod context;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod profile;
pub mod safety;

// Re-exports for convenience
pub use anomaly::{AnomalyInjector, Injection};
pub use context::{DriftState, SimContext};
pub use dataset::{Dataset, DatasetError, LabelCounts};
pub use error::SimError;
pub use generator::{generate, GenerationReport, TwinGenerator};
pub use profile::InputProfile;
pub use safety::{SafetySupervisor, StopEvent, StopReason};
