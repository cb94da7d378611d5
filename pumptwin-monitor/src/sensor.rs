// Pump Twin Monitor - Sensor filters
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! One scalar Kalman filter per measurement channel.
//!
//! A channel's filter starts at its first reading. A missing reading leaves
//! the filter untouched: no time update, no measurement update.

use pumptwin::{Channel, FilterError, KalmanParams, ScalarKalman};
use serde::{Deserialize, Serialize};

/// Outcome of one reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    /// The reading was missing.
    Dropout,
    /// Raw value and the filtered estimate after the update.
    Filtered { z: f64, estimate: f64 },
}

/// Filter for a single channel.
#[derive(Debug, Clone)]
pub struct SensorMonitor {
    channel: Channel,
    params: KalmanParams,
    filter: Option<ScalarKalman>,
}

impl SensorMonitor {
    pub fn new(channel: Channel, params: KalmanParams) -> Result<Self, FilterError> {
        ScalarKalman::new(0.0, &params)?;
        Ok(Self {
            channel,
            params,
            filter: None,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Current estimate, `None` before the first reading.
    pub fn estimate(&self) -> Option<f64> {
        self.filter.as_ref().map(ScalarKalman::estimate)
    }

    pub fn covariance(&self) -> Option<f64> {
        self.filter.as_ref().map(ScalarKalman::covariance)
    }

    /// Feed one reading in step order.
    pub fn observe(&mut self, z: Option<f64>) -> Result<Reading, FilterError> {
        let Some(z) = z else {
            return Ok(Reading::Dropout);
        };

        let mut filter = match self.filter {
            Some(filter) => filter,
            None => ScalarKalman::new(z, &self.params)?,
        };
        let estimate = filter.step(z);
        self.filter = Some(filter);
        Ok(Reading::Filtered { z, estimate })
    }
}

/// Filters for all five channels.
#[derive(Debug, Clone)]
pub struct SensorBank {
    monitors: Vec<SensorMonitor>,
}

impl SensorBank {
    pub fn new(params: KalmanParams) -> Result<Self, FilterError> {
        let monitors = Channel::ALL
            .iter()
            .map(|c| SensorMonitor::new(*c, params))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { monitors })
    }

    pub fn get(&self, channel: Channel) -> &SensorMonitor {
        &self.monitors[channel.index()]
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut SensorMonitor {
        &mut self.monitors[channel.index()]
    }

    /// Estimates in channel order.
    pub fn estimates(&self) -> [Option<f64>; 5] {
        Channel::ALL.map(|c| self.get(c).estimate())
    }
}
