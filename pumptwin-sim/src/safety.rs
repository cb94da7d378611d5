// Pump Twin Sim - Safety supervisor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Early stop on static overspeed and overtemperature limits.
//!
//! Speed and temperature readings are smoothed by their own scalar Kalman
//! filters; the filtered values are compared against the limits, speed first.

use pumptwin::{FilterError, KalmanParams, Measurement, SafetyLimits, ScalarKalman};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Overspeed,
    Overtemperature,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Overspeed => "Overspeed",
            StopReason::Overtemperature => "Overtemperature",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a safety stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopEvent {
    /// Step whose row triggered the stop.
    pub step: usize,
    pub reason: StopReason,
    /// Filtered value that exceeded the limit.
    pub filtered_value: f64,
    pub limit: f64,
}

impl fmt::Display for StopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {}: {} ({:.2} > {:.2})",
            self.step, self.reason, self.filtered_value, self.limit
        )
    }
}

/// Filters the supervised readings and checks them against the limits.
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    limits: SafetyLimits,
    speed: Option<ScalarKalman>,
    temperature: Option<ScalarKalman>,
}

impl SafetySupervisor {
    pub fn new(limits: SafetyLimits) -> Result<Self, FilterError> {
        // Reject bad variances now rather than at the first reading
        ScalarKalman::new(0.0, &limits.filter)?;
        Ok(Self {
            limits,
            speed: None,
            temperature: None,
        })
    }

    /// Filtered speed, once a reading has been seen.
    pub fn filtered_speed(&self) -> Option<f64> {
        self.speed.as_ref().map(ScalarKalman::estimate)
    }

    /// Filtered temperature, once a reading has been seen.
    pub fn filtered_temperature(&self) -> Option<f64> {
        self.temperature.as_ref().map(ScalarKalman::estimate)
    }

    /// Feed one row. Returns the stop event if a limit is exceeded.
    pub fn observe(
        &mut self,
        step: usize,
        measurement: Option<&Measurement>,
    ) -> Result<Option<StopEvent>, FilterError> {
        let Some(m) = measurement else {
            return Ok(None);
        };
        let params = self.limits.filter;

        let speed = filter_reading(&mut self.speed, m.omega, &params)?;
        if speed > self.limits.max_speed {
            return Ok(Some(StopEvent {
                step,
                reason: StopReason::Overspeed,
                filtered_value: speed,
                limit: self.limits.max_speed,
            }));
        }

        let temperature = filter_reading(&mut self.temperature, m.temperature, &params)?;
        if temperature > self.limits.max_temperature {
            return Ok(Some(StopEvent {
                step,
                reason: StopReason::Overtemperature,
                filtered_value: temperature,
                limit: self.limits.max_temperature,
            }));
        }

        Ok(None)
    }
}

fn filter_reading(
    slot: &mut Option<ScalarKalman>,
    z: f64,
    params: &KalmanParams,
) -> Result<f64, FilterError> {
    let mut filter = match *slot {
        Some(filter) => filter,
        None => ScalarKalman::new(z, params)?,
    };
    let estimate = filter.step(z);
    *slot = Some(filter);
    Ok(estimate)
}
