// Pump Twin Sim - Input profile
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Control input profile.
//!
//! Deterministic trends (voltage ramp, load and valve sinusoids) plus jitter
//! and the scripted surge, burst and valve-fault windows of the config.
//! Two draws per step, in order: voltage jitter then valve jitter.

use crate::error::SimError;
use pumptwin::{ControlInput, ProfileConfig};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// Produces the control input for each step.
#[derive(Debug, Clone)]
pub struct InputProfile {
    config: ProfileConfig,
    voltage_jitter: Normal<f64>,
    valve_jitter: Normal<f64>,
}

impl InputProfile {
    pub fn new(config: ProfileConfig) -> Result<Self, SimError> {
        let voltage_jitter = Normal::new(0.0, config.voltage.jitter)?;
        let valve_jitter = Normal::new(0.0, config.valve.jitter)?;
        Ok(Self {
            config,
            voltage_jitter,
            valve_jitter,
        })
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Deterministic voltage trend at step `t`, surge included.
    pub fn voltage_trend(&self, t: usize) -> f64 {
        let v = &self.config.voltage;
        let mut voltage = v.base + v.ramp_amplitude * ((t as f64 - v.ramp_center) / v.ramp_width).tanh();
        if let Some(surge) = &self.config.surge {
            if surge.window.is_active(t) {
                voltage += surge.delta_v;
            }
        }
        voltage
    }

    /// Load torque at step `t`, bursts included.
    pub fn load_torque(&self, t: usize) -> f64 {
        let l = &self.config.load;
        let phase = (1.0 + (t as f64 / l.period * PI).sin()) / 2.0;
        let mut load = l.base * (l.low + (l.high - l.low) * phase);
        if let Some(burst) = &self.config.load_burst {
            if burst.window.is_active(t) {
                load *= burst.factor;
            }
        }
        load
    }

    /// Deterministic valve trend at step `t`, before jitter and clamping.
    pub fn valve_trend(&self, t: usize) -> f64 {
        let v = &self.config.valve;
        v.base - v.swing * (1.0 + ((t as f64 - v.phase) / v.period * PI).sin()) / 2.0
    }

    /// Control input for step `t`.
    pub fn input_at<R: Rng + ?Sized>(&self, t: usize, rng: &mut R) -> ControlInput {
        let voltage = self.voltage_trend(t) + self.voltage_jitter.sample(rng);
        let load_torque = self.load_torque(t);

        let v = &self.config.valve;
        let mut valve = (self.valve_trend(t) + self.valve_jitter.sample(rng)).clamp(v.min, v.max);
        if let Some(fault) = &self.config.valve_fault {
            if fault.window.is_active(t) {
                // Partial blockage, applied after clamping
                valve *= fault.factor;
            }
        }

        ControlInput::new(voltage, load_torque, valve)
    }
}
