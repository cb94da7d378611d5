//! State update (`fx`) and measurement (`hx`) for the pump twin.
//!
//! State `x = [omega, theta, Tm]`, input `u = (V, load_torque, valve)`,
//! output `y = (omega, temperature, flow, pressure, vibration)`.
//!
//! The relations are toy physics. Downstream thresholds are tuned to their
//! magnitudes, so the functional forms stay exactly as written here.

use crate::config::{HydraulicParams, PlantParams};
use crate::types::{ControlInput, Measurement, TwinState};

/// Clamp `value` into `[lo, hi]`.
pub fn saturate(value: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(value))
}

/// Flow penalty at high speed with a partially closed valve.
///
/// `1 + 2 * severity * (1 - valve)`, with `severity = max(0, omega - w_c) / w_c`.
/// Never below 1 for a valve in `[0, 1]`.
pub fn cavitation_factor(omega: f64, valve: f64, hydraulic: &HydraulicParams) -> f64 {
    let cav = hydraulic.cavitation_omega;
    let severity = (omega - cav).max(0.0) / cav;
    let restriction = 1.0 - valve;
    1.0 + 2.0 * severity * restriction
}

/// Pure state-transition and measurement functions over fixed constants.
#[derive(Debug, Clone, Default)]
pub struct TwinModel {
    params: PlantParams,
}

impl TwinModel {
    pub fn new(params: PlantParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    /// Advance the state by one explicit Euler step of `dt` seconds.
    pub fn fx(&self, x: &TwinState, u: &ControlInput, dt: f64) -> TwinState {
        let m = &self.params.mechanical;

        // Motor torque from voltage
        let motor_torque = m.torque_constant * u.voltage;

        // Viscous friction grows with degradation
        let friction = m.base_friction + m.friction_per_degradation * x.theta;

        let domega = (motor_torque - u.load_torque - friction * x.omega) / m.inertia;

        // Wear grows with speed, in either direction
        let dtheta = self.params.wear_rate * x.omega.abs();

        // First-order relaxation toward a speed-dependent setpoint
        let dtemp = (m.ambient_temperature + m.heating_coeff * x.omega.powi(2) - x.temperature)
            / m.thermal_tau;

        TwinState {
            omega: x.omega + dt * domega,
            theta: (x.theta + dt * dtheta).max(0.0),
            temperature: x.temperature + dt * dtemp,
        }
    }

    /// Noise-free sensor readings for a state.
    pub fn hx(&self, x: &TwinState, u: &ControlInput) -> Measurement {
        let h = &self.params.hydraulic;
        let valve = saturate(u.valve, 0.0, 1.0);
        let omega = x.omega;

        let flow = h.flow_coeff * omega * valve / cavitation_factor(omega, valve, h);
        let pressure =
            h.pressure_coeff * valve * omega * (1.0 - 0.2 * ((omega - 200.0) / 200.0).tanh());
        let vibration = self.params.vibration_coeff * x.theta * omega.powi(2);

        Measurement {
            omega,
            temperature: x.temperature,
            flow,
            pressure,
            vibration,
        }
    }

    /// Equilibrium speed for a constant input with theta held fixed.
    pub fn steady_state_omega(&self, u: &ControlInput, theta: f64) -> f64 {
        let m = &self.params.mechanical;
        let friction = m.base_friction + m.friction_per_degradation * theta;
        (m.torque_constant * u.voltage - u.load_torque) / friction
    }

    /// Equilibrium temperature for a given speed.
    pub fn steady_state_temperature(&self, omega: f64) -> f64 {
        let m = &self.params.mechanical;
        m.ambient_temperature + m.heating_coeff * omega.powi(2)
    }
}
