// Pump Twin Monitor - Statistical monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Pump Twin Monitor
//!
//! Per-channel monitoring of a pump twin dataset stream:
//!
//! - **Sensor filters**: one scalar Kalman filter per channel
//! - **Warmup baselines**: mean, sample std and threshold frozen after warmup
//! - **Alert rules**: `DROPOUT`, `THRESH` and `RESID`, in channel order per row
//! - **Alert sinks**: text log file or any custom [`AlertSink`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use pumptwin::TwinConfig;
//! use pumptwin_monitor::{run_monitor, Execution};
//! # fn rows() -> Vec<pumptwin::DatasetRow> { Vec::new() }
//!
//! let config = TwinConfig::default();
//! let report = run_monitor(&rows(), &config.monitor, Execution::Sequential).unwrap();
//! report.alerts.save("alerts.txt").unwrap();
//! println!("Total alerts: {}", report.alerts.total());
//! ```

pub mod alert;
pub mod baseline;
pub mod error;
pub mod pipeline;
pub mod sensor;

pub use alert::{AlertEngine, AlertKind, AlertLog, AlertRecord, AlertRules, AlertSink, TextSink};
pub use baseline::{Baseline, BaselineQuality, Baseliner, FieldStats, ThresholdRecord};
pub use error::{MonitorError, Result};
pub use pipeline::{run_monitor, Execution, Monitor, MonitorReport};
pub use sensor::{Reading, SensorBank, SensorMonitor};
