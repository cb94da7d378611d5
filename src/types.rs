//! Domain types shared by the simulator and the monitor.
//!
//! The missing-sample sentinel is carried by the type system: a dataset row
//! holds an `Option<Measurement>`, and `None` means every channel dropped out
//! at once. A partially missing measurement cannot be built.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Measurement channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Omega,
    Temperature,
    Flow,
    Pressure,
    Vibration,
}

impl Channel {
    /// All channels in column order.
    pub const ALL: [Channel; 5] = [
        Channel::Omega,
        Channel::Temperature,
        Channel::Flow,
        Channel::Pressure,
        Channel::Vibration,
    ];

    /// Channels that receive the shared calibration drift.
    pub const CONTINUOUS: [Channel; 4] = [
        Channel::Omega,
        Channel::Temperature,
        Channel::Flow,
        Channel::Pressure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Omega => "omega",
            Channel::Temperature => "temperature",
            Channel::Flow => "flow",
            Channel::Pressure => "pressure",
            Channel::Vibration => "vibration",
        }
    }

    /// Position in [`Channel::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown channel '{}'", s))
    }
}

/// Twin state: shaft speed, degradation and motor temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwinState {
    /// Angular velocity [rad/s].
    pub omega: f64,
    /// Degradation, never negative and never decreasing.
    pub theta: f64,
    /// Motor temperature [°C].
    pub temperature: f64,
}

impl TwinState {
    pub fn new(omega: f64, theta: f64, temperature: f64) -> Self {
        Self {
            omega,
            theta,
            temperature,
        }
    }
}

impl Default for TwinState {
    fn default() -> Self {
        Self::new(0.0, 0.01, 25.0)
    }
}

/// Control input applied during one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Supply voltage [V].
    pub voltage: f64,
    /// Opposing load torque [N*m].
    pub load_torque: f64,
    /// Valve opening; the model clamps it to [0, 1].
    pub valve: f64,
}

impl ControlInput {
    pub fn new(voltage: f64, load_torque: f64, valve: f64) -> Self {
        Self {
            voltage,
            load_torque,
            valve,
        }
    }
}

/// One complete sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub omega: f64,
    pub temperature: f64,
    pub flow: f64,
    pub pressure: f64,
    pub vibration: f64,
}

impl Measurement {
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Omega => self.omega,
            Channel::Temperature => self.temperature,
            Channel::Flow => self.flow,
            Channel::Pressure => self.pressure,
            Channel::Vibration => self.vibration,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut f64 {
        match channel {
            Channel::Omega => &mut self.omega,
            Channel::Temperature => &mut self.temperature,
            Channel::Flow => &mut self.flow,
            Channel::Pressure => &mut self.pressure,
            Channel::Vibration => &mut self.vibration,
        }
    }

    /// Values in [`Channel::ALL`] order.
    pub fn values(&self) -> [f64; 5] {
        [
            self.omega,
            self.temperature,
            self.flow,
            self.pressure,
            self.vibration,
        ]
    }

    pub fn from_values(values: [f64; 5]) -> Self {
        Self {
            omega: values[0],
            temperature: values[1],
            flow: values[2],
            pressure: values[3],
            vibration: values[4],
        }
    }
}

/// Ground-truth anomaly labels for one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub spike: bool,
    pub drift: bool,
    pub dropout: bool,
}

impl Labels {
    pub fn dropout() -> Self {
        Self {
            dropout: true,
            ..Default::default()
        }
    }

    pub fn any(&self) -> bool {
        self.spike || self.drift || self.dropout
    }
}

/// One step of generated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    /// Step index.
    pub step: usize,
    /// Epoch + step * dt.
    pub timestamp: NaiveDateTime,
    pub input: ControlInput,
    /// `None` when the whole sample dropped out.
    pub measurement: Option<Measurement>,
    pub labels: Labels,
}

impl DatasetRow {
    /// Reading of one channel, `None` for a dropout row.
    pub fn reading(&self, channel: Channel) -> Option<f64> {
        self.measurement.map(|m| m.get(channel))
    }

    pub fn is_dropout(&self) -> bool {
        self.measurement.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order_and_names() {
        let names: Vec<&str> = Channel::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec!["omega", "temperature", "flow", "pressure", "vibration"]
        );
        for (i, c) in Channel::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("pressure".parse::<Channel>().unwrap(), Channel::Pressure);
        assert!("rpm".parse::<Channel>().is_err());
    }

    #[test]
    fn test_measurement_accessors() {
        let mut m = Measurement::from_values([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(m.get(Channel::Flow), 3.0);
        *m.get_mut(Channel::Vibration) += 1.0;
        assert_eq!(m.values(), [1.0, 2.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn test_dropout_row_has_no_readings() {
        let row = DatasetRow {
            step: 3,
            timestamp: chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            input: ControlInput::new(24.0, 1.0, 0.8),
            measurement: None,
            labels: Labels::dropout(),
        };
        assert!(row.is_dropout());
        for c in Channel::ALL {
            assert_eq!(row.reading(c), None);
        }
        assert!(row.labels.any());
    }
}
