//! Configuration surface for the pump twin.
//!
//! Every constant the model, the input profile, the injector and the monitor
//! use lives here, grouped the way the parameters are tuned. Defaults are the
//! closed-loop twin values. `TwinConfig::validate` rejects degenerate values
//! before any run starts.

use crate::error::{ConfigError, Result};
use crate::types::{Channel, TwinState};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwinConfig {
    /// Physical constants of the pump.
    pub plant: PlantParams,
    /// Step size, step count, seed and termination policy.
    pub simulation: SimulationConfig,
    /// Sensor noise and shared calibration drift.
    pub noise: NoiseConfig,
    /// Control input trends and scripted windows.
    pub profile: ProfileConfig,
    /// Anomaly injection probabilities and magnitudes.
    pub anomaly: AnomalyConfig,
    /// Filtering, baselining and alert rules.
    pub monitor: MonitorConfig,
}

impl TwinConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of steps.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.simulation.steps = steps;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.simulation.seed = seed;
        self
    }

    /// Set the termination policy.
    pub fn with_termination(mut self, termination: Termination) -> Self {
        self.simulation.termination = termination;
        self
    }

    /// Disable every stochastic anomaly.
    pub fn without_anomalies(mut self) -> Self {
        self.anomaly.probabilities = AnomalyProbabilities::none();
        self
    }

    /// Check every group, failing on the first degenerate value.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.plant.validate()?;
        self.simulation.validate()?;
        self.noise.validate()?;
        self.profile.validate()?;
        self.anomaly.validate()?;
        self.monitor.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TwinConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// Physical constants of the pump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    pub mechanical: MechanicalParams,
    pub hydraulic: HydraulicParams,
    /// Vibration ~ coeff * theta * omega^2 [g].
    pub vibration_coeff: f64,
    /// Degradation growth per unit |omega| per second.
    pub wear_rate: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            mechanical: MechanicalParams::default(),
            hydraulic: HydraulicParams::default(),
            vibration_coeff: 0.4,
            wear_rate: 1e-5,
        }
    }
}

impl PlantParams {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.mechanical.validate()?;
        self.hydraulic.validate()?;
        finite("plant.vibration_coeff", self.vibration_coeff)?;
        non_negative("plant.wear_rate", self.wear_rate)?;
        Ok(())
    }
}

/// Mechanical and thermal constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanicalParams {
    /// Moment of inertia J [kg*m^2].
    pub inertia: f64,
    /// Base viscous friction B0 [N*m*s/rad].
    pub base_friction: f64,
    /// Added friction per unit degradation.
    pub friction_per_degradation: f64,
    /// Motor torque constant Kt [N*m/V].
    pub torque_constant: f64,
    /// Thermal time constant [s].
    pub thermal_tau: f64,
    /// Ambient temperature [°C].
    pub ambient_temperature: f64,
    /// Heating per (rad/s)^2 [°C].
    pub heating_coeff: f64,
}

impl Default for MechanicalParams {
    fn default() -> Self {
        Self {
            inertia: 0.08,
            base_friction: 0.02,
            friction_per_degradation: 0.15,
            torque_constant: 0.08,
            thermal_tau: 15.0,
            ambient_temperature: 25.0,
            heating_coeff: 0.002,
        }
    }
}

impl MechanicalParams {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        positive("plant.mechanical.inertia", self.inertia)?;
        non_negative("plant.mechanical.base_friction", self.base_friction)?;
        non_negative(
            "plant.mechanical.friction_per_degradation",
            self.friction_per_degradation,
        )?;
        finite("plant.mechanical.torque_constant", self.torque_constant)?;
        positive("plant.mechanical.thermal_tau", self.thermal_tau)?;
        finite(
            "plant.mechanical.ambient_temperature",
            self.ambient_temperature,
        )?;
        finite("plant.mechanical.heating_coeff", self.heating_coeff)?;
        Ok(())
    }
}

/// Hydraulic constants, scaled to ~50 bar and ~7 L/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraulicParams {
    /// Flow per rad/s [L/s].
    pub flow_coeff: f64,
    /// Pressure per (rad/s * valve) [bar].
    pub pressure_coeff: f64,
    /// Speed above which cavitation starts.
    pub cavitation_omega: f64,
}

impl Default for HydraulicParams {
    fn default() -> Self {
        Self {
            flow_coeff: 0.36,
            pressure_coeff: 2.0,
            cavitation_omega: 200.0,
        }
    }
}

impl HydraulicParams {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        finite("plant.hydraulic.flow_coeff", self.flow_coeff)?;
        finite("plant.hydraulic.pressure_coeff", self.pressure_coeff)?;
        positive("plant.hydraulic.cavitation_omega", self.cavitation_omega)?;
        Ok(())
    }
}

/// Discrete-time simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seconds per step.
    pub dt: f64,
    /// Number of steps to run.
    pub steps: usize,
    /// Seed of the single random stream.
    pub seed: u64,
    /// Timestamp of step 0.
    pub epoch: NaiveDateTime,
    /// State before step 0.
    pub initial_state: TwinState,
    /// When the run ends.
    pub termination: Termination,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            steps: 3000,
            seed: 42,
            epoch: default_epoch(),
            initial_state: TwinState::default(),
            termination: Termination::RunToCompletion,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        positive("simulation.dt", self.dt)?;
        if self.steps == 0 {
            return Err(ConfigError::ZeroCount {
                field: "simulation.steps",
            });
        }
        finite("simulation.initial_state.omega", self.initial_state.omega)?;
        non_negative("simulation.initial_state.theta", self.initial_state.theta)?;
        finite(
            "simulation.initial_state.temperature",
            self.initial_state.temperature,
        )?;
        let millis = self.dt * MILLIS_PER_SECOND;
        if millis.round() < 1.0 || (millis - millis.round()).abs() > 1e-9 * millis {
            return Err(ConfigError::SubMillisecond {
                field: "simulation.dt",
                value: self.dt,
            });
        }
        if self.timestamp(self.steps - 1).is_none() {
            return Err(ConfigError::TimestampOverflow {
                steps: self.steps,
                dt: self.dt,
                epoch: self.epoch.to_string(),
            });
        }
        if let Termination::SafetyStop(limits) = &self.termination {
            finite("simulation.termination.max_speed", limits.max_speed)?;
            finite(
                "simulation.termination.max_temperature",
                limits.max_temperature,
            )?;
            limits.filter.validate()?;
        }
        Ok(())
    }

    /// Timestamp of a step, `None` when it falls outside the calendar range.
    pub fn timestamp(&self, step: usize) -> Option<NaiveDateTime> {
        let millis = (step as f64 * self.dt * MILLIS_PER_SECOND).round();
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return None;
        }
        let offset = Duration::try_milliseconds(millis as i64)?;
        self.epoch.checked_add_signed(offset)
    }
}

/// Dataset timestamps have millisecond resolution.
const MILLIS_PER_SECOND: f64 = 1e3;

fn default_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Run termination policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// Run every configured step.
    RunToCompletion,
    /// Stop as soon as filtered speed or temperature exceeds a static limit.
    SafetyStop(SafetyLimits),
}

/// Static safety limits for the early stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyLimits {
    /// Overspeed limit [rad/s].
    pub max_speed: f64,
    /// Overtemperature limit [°C].
    pub max_temperature: f64,
    /// Filter applied to the supervised readings.
    pub filter: KalmanParams,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_speed: 100.0,
            max_temperature: 80.0,
            filter: KalmanParams::default(),
        }
    }
}

/// Sensor noise sigmas and shared calibration drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub omega: f64,
    pub temperature: f64,
    pub flow: f64,
    pub pressure: f64,
    pub vibration: f64,
    /// Std of the per-step increment of the shared drift walk.
    pub shared_drift_step: f64,
    /// Lower bound of the per-channel drift scale.
    pub shared_drift_scale_low: f64,
    /// Upper bound of the per-channel drift scale.
    pub shared_drift_scale_high: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            omega: 0.05,
            temperature: 0.05,
            flow: 0.02,
            pressure: 0.03,
            vibration: 0.01,
            shared_drift_step: 0.0005,
            shared_drift_scale_low: 0.05,
            shared_drift_scale_high: 0.2,
        }
    }
}

impl NoiseConfig {
    /// Noise sigma of a channel.
    pub fn sigma(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Omega => self.omega,
            Channel::Temperature => self.temperature,
            Channel::Flow => self.flow,
            Channel::Pressure => self.pressure,
            Channel::Vibration => self.vibration,
        }
    }

    /// All noise off, shared drift included.
    pub fn silent() -> Self {
        Self {
            omega: 0.0,
            temperature: 0.0,
            flow: 0.0,
            pressure: 0.0,
            vibration: 0.0,
            shared_drift_step: 0.0,
            ..Default::default()
        }
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        non_negative("noise.omega", self.omega)?;
        non_negative("noise.temperature", self.temperature)?;
        non_negative("noise.flow", self.flow)?;
        non_negative("noise.pressure", self.pressure)?;
        non_negative("noise.vibration", self.vibration)?;
        non_negative("noise.shared_drift_step", self.shared_drift_step)?;
        finite("noise.shared_drift_scale_low", self.shared_drift_scale_low)?;
        finite("noise.shared_drift_scale_high", self.shared_drift_scale_high)?;
        if self.shared_drift_scale_low >= self.shared_drift_scale_high {
            return Err(ConfigError::InvertedRange {
                field: "noise.shared_drift_scale",
                low: self.shared_drift_scale_low,
                high: self.shared_drift_scale_high,
            });
        }
        Ok(())
    }
}

/// Step window during which a scripted effect applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    /// Active while `start < t < end`.
    Span { start: usize, end: usize },
    /// Active while `t % period > after`.
    Periodic { period: usize, after: usize },
}

impl Window {
    pub fn is_active(&self, t: usize) -> bool {
        match *self {
            Window::Span { start, end } => start < t && t < end,
            Window::Periodic { period, after } => period > 0 && t % period > after,
        }
    }

    fn validate(&self, field: &'static str) -> std::result::Result<(), ConfigError> {
        let never = match *self {
            Window::Span { start, end } => end <= start.saturating_add(1),
            Window::Periodic { period, after } => {
                period == 0 || after.saturating_add(1) >= period
            }
        };
        if never {
            return Err(ConfigError::EmptyWindow {
                field,
                detail: format!("{:?}", self),
            });
        }
        Ok(())
    }
}

/// Control input trends and scripted windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub voltage: VoltageProfile,
    pub load: LoadProfile,
    pub valve: ValveProfile,
    /// Periodic voltage bump (load surge).
    pub surge: Option<VoltageSurge>,
    /// Short bursts of increased load torque.
    pub load_burst: Option<LoadBurst>,
    /// Partial valve obstruction.
    pub valve_fault: Option<ValveFault>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            voltage: VoltageProfile::default(),
            load: LoadProfile::default(),
            valve: ValveProfile::default(),
            surge: Some(VoltageSurge {
                window: Window::Periodic {
                    period: 400,
                    after: 300,
                },
                delta_v: 1.0,
            }),
            load_burst: Some(LoadBurst {
                window: Window::Periodic {
                    period: 500,
                    after: 400,
                },
                factor: 1.2,
            }),
            valve_fault: Some(ValveFault {
                window: Window::Span {
                    start: 1500,
                    end: 1800,
                },
                factor: 0.55,
            }),
        }
    }
}

impl ProfileConfig {
    /// Constant inputs: no ramp, no sinusoids, no jitter, no windows.
    pub fn constant(voltage: f64, load_torque: f64, valve: f64) -> Self {
        Self {
            voltage: VoltageProfile {
                base: voltage,
                ramp_amplitude: 0.0,
                jitter: 0.0,
                ..Default::default()
            },
            load: LoadProfile {
                base: load_torque,
                low: 1.0,
                high: 1.0,
                ..Default::default()
            },
            valve: ValveProfile {
                base: valve,
                swing: 0.0,
                jitter: 0.0,
                ..Default::default()
            },
            surge: None,
            load_burst: None,
            valve_fault: None,
        }
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        finite("profile.voltage.base", self.voltage.base)?;
        finite("profile.voltage.ramp_amplitude", self.voltage.ramp_amplitude)?;
        positive("profile.voltage.ramp_width", self.voltage.ramp_width)?;
        non_negative("profile.voltage.jitter", self.voltage.jitter)?;
        finite("profile.load.base", self.load.base)?;
        if self.load.low > self.load.high {
            return Err(ConfigError::InvertedRange {
                field: "profile.load",
                low: self.load.low,
                high: self.load.high,
            });
        }
        positive("profile.load.period", self.load.period)?;
        finite("profile.valve.base", self.valve.base)?;
        finite("profile.valve.swing", self.valve.swing)?;
        positive("profile.valve.period", self.valve.period)?;
        non_negative("profile.valve.jitter", self.valve.jitter)?;
        if !(0.0..=1.0).contains(&self.valve.min)
            || !(0.0..=1.0).contains(&self.valve.max)
            || self.valve.min > self.valve.max
        {
            return Err(ConfigError::InvertedRange {
                field: "profile.valve.min/max",
                low: self.valve.min,
                high: self.valve.max,
            });
        }
        if let Some(surge) = &self.surge {
            surge.window.validate("profile.surge.window")?;
            finite("profile.surge.delta_v", surge.delta_v)?;
        }
        if let Some(burst) = &self.load_burst {
            burst.window.validate("profile.load_burst.window")?;
            non_negative("profile.load_burst.factor", burst.factor)?;
        }
        if let Some(fault) = &self.valve_fault {
            fault.window.validate("profile.valve_fault.window")?;
            non_negative("profile.valve_fault.factor", fault.factor)?;
        }
        Ok(())
    }
}

/// `V = base + ramp_amplitude * tanh((t - ramp_center) / ramp_width) + N(0, jitter)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageProfile {
    pub base: f64,
    pub ramp_amplitude: f64,
    pub ramp_center: f64,
    pub ramp_width: f64,
    pub jitter: f64,
}

impl Default for VoltageProfile {
    fn default() -> Self {
        Self {
            base: 24.0,
            ramp_amplitude: 2.0,
            ramp_center: 200.0,
            ramp_width: 200.0,
            jitter: 0.1,
        }
    }
}

/// `load = base * (low + (high - low) * (1 + sin(t * pi / period)) / 2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadProfile {
    pub base: f64,
    pub low: f64,
    pub high: f64,
    pub period: f64,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            base: 1.0,
            low: 0.8,
            high: 1.2,
            period: 180.0,
        }
    }
}

/// `valve = clamp(base - swing * (1 + sin((t - phase) * pi / period)) / 2 + N(0, jitter), min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValveProfile {
    pub base: f64,
    pub swing: f64,
    pub phase: f64,
    pub period: f64,
    pub jitter: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for ValveProfile {
    fn default() -> Self {
        Self {
            base: 0.8,
            swing: 0.3,
            phase: 500.0,
            period: 180.0,
            jitter: 0.05,
            min: 0.2,
            max: 1.0,
        }
    }
}

/// Voltage added while the window is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageSurge {
    pub window: Window,
    pub delta_v: f64,
}

/// Load torque multiplier while the window is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBurst {
    pub window: Window,
    pub factor: f64,
}

/// Valve multiplier while the window is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValveFault {
    pub window: Window,
    pub factor: f64,
}

/// Per-step anomaly probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyProbabilities {
    pub spike: f64,
    pub drift: f64,
    pub dropout: f64,
}

impl Default for AnomalyProbabilities {
    fn default() -> Self {
        Self {
            spike: 0.002,
            drift: 0.001,
            dropout: 0.001,
        }
    }
}

impl AnomalyProbabilities {
    pub fn none() -> Self {
        Self {
            spike: 0.0,
            drift: 0.0,
            dropout: 0.0,
        }
    }

    fn validate(&self, prefix: &'static str) -> std::result::Result<(), ConfigError> {
        probability(prefix, self.spike)?;
        probability(prefix, self.drift)?;
        probability(prefix, self.dropout)?;
        Ok(())
    }
}

/// Anomaly injection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub probabilities: AnomalyProbabilities,
    /// Spike multiplies the value by `1 ± spike_mult`.
    pub spike_mult: f64,
    /// Magnitude of each signed drift increment.
    pub drift_per_step: f64,
    /// Probability overrides pinned to single steps.
    pub overrides: Vec<AnomalyOverride>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            probabilities: AnomalyProbabilities::default(),
            spike_mult: 3.0,
            drift_per_step: 0.002,
            overrides: Vec::new(),
        }
    }
}

impl AnomalyConfig {
    /// Pin an override to a step.
    pub fn with_override(mut self, anomaly_override: AnomalyOverride) -> Self {
        self.overrides.push(anomaly_override);
        self
    }

    /// Effective probabilities and pinned spike channel at a step.
    pub fn at_step(&self, step: usize) -> (AnomalyProbabilities, Option<Channel>) {
        let mut probabilities = self.probabilities;
        let mut spike_channel = None;
        for o in self.overrides.iter().filter(|o| o.step == step) {
            if let Some(p) = o.dropout {
                probabilities.dropout = p;
            }
            if let Some(p) = o.spike {
                probabilities.spike = p;
            }
            if let Some(p) = o.drift {
                probabilities.drift = p;
            }
            if o.spike_channel.is_some() {
                spike_channel = o.spike_channel;
            }
        }
        (probabilities, spike_channel)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.probabilities.validate("anomaly.probabilities")?;
        non_negative("anomaly.spike_mult", self.spike_mult)?;
        non_negative("anomaly.drift_per_step", self.drift_per_step)?;
        for o in &self.overrides {
            for p in [o.dropout, o.spike, o.drift].into_iter().flatten() {
                probability("anomaly.overrides", p)?;
            }
        }
        Ok(())
    }
}

/// Replaces the anomaly probabilities at one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyOverride {
    pub step: usize,
    pub dropout: Option<f64>,
    pub spike: Option<f64>,
    pub drift: Option<f64>,
    /// Channel hit by a spike at this step instead of a random one.
    pub spike_channel: Option<Channel>,
}

impl AnomalyOverride {
    /// Force a dropout at `step`.
    pub fn dropout_at(step: usize) -> Self {
        Self {
            step,
            dropout: Some(1.0),
            ..Default::default()
        }
    }

    /// Force a spike on `channel` at `step`.
    pub fn spike_at(step: usize, channel: Channel) -> Self {
        Self {
            step,
            dropout: Some(0.0),
            spike: Some(1.0),
            spike_channel: Some(channel),
            ..Default::default()
        }
    }
}

/// Scalar Kalman filter variances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanParams {
    /// Process variance Q.
    pub process_var: f64,
    /// Measurement variance R.
    pub measurement_var: f64,
    /// Initial error covariance P0.
    pub initial_covariance: f64,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            process_var: 1e-3,
            measurement_var: 1e-2,
            initial_covariance: 1.0,
        }
    }
}

impl KalmanParams {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        positive("kalman.process_var", self.process_var)?;
        // R = 0 is an exact sensor: the gain is 1 and the estimate tracks the reading.
        non_negative("kalman.measurement_var", self.measurement_var)?;
        positive("kalman.initial_covariance", self.initial_covariance)?;
        Ok(())
    }
}

/// Monitor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Leading rows used for the frozen baseline.
    pub warmup_steps: usize,
    /// Threshold = mean + sigma_k * std.
    pub sigma_k: f64,
    /// Residual band = max(residual_k * std, residual_floor).
    pub residual_k: f64,
    pub residual_floor: f64,
    pub kalman: KalmanParams,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            warmup_steps: 200,
            sigma_k: 3.0,
            residual_k: 3.0,
            residual_floor: 1e-6,
            kalman: KalmanParams::default(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.warmup_steps == 0 {
            return Err(ConfigError::ZeroCount {
                field: "monitor.warmup_steps",
            });
        }
        positive("monitor.sigma_k", self.sigma_k)?;
        positive("monitor.residual_k", self.residual_k)?;
        non_negative("monitor.residual_floor", self.residual_floor)?;
        self.kalman.validate()?;
        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn probability(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = TwinConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.steps, 3000);
        assert_eq!(config.monitor.warmup_steps, 200);
        assert_eq!(config.plant.vibration_coeff, 0.4);
        assert_eq!(config.plant.wear_rate, 1e-5);
    }

    #[test]
    fn test_zero_dt_rejected() {
        let mut config = TwinConfig::default();
        config.simulation.dt = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "simulation.dt",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_negative_probability_rejected() {
        let mut config = TwinConfig::default();
        config.anomaly.probabilities.spike = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn test_zero_process_variance_rejected() {
        let mut config = TwinConfig::default();
        config.monitor.kalman.process_var = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { .. })
        ));

        let mut config = TwinConfig::default();
        config.monitor.kalman.measurement_var = -1e-3;
        assert!(matches!(config.validate(), Err(ConfigError::Negative { .. })));
    }

    #[test]
    fn test_empty_window_rejected() {
        let mut config = TwinConfig::default();
        config.profile.valve_fault = Some(ValveFault {
            window: Window::Span { start: 10, end: 11 },
            factor: 0.5,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn test_window_activity() {
        let span = Window::Span {
            start: 1500,
            end: 1800,
        };
        assert!(!span.is_active(1500));
        assert!(span.is_active(1501));
        assert!(span.is_active(1799));
        assert!(!span.is_active(1800));

        let periodic = Window::Periodic {
            period: 400,
            after: 300,
        };
        assert!(!periodic.is_active(300));
        assert!(periodic.is_active(301));
        assert!(periodic.is_active(399));
        assert!(!periodic.is_active(400));
        assert!(periodic.is_active(701));
    }

    #[test]
    fn test_override_lookup() {
        let anomaly = AnomalyConfig::default()
            .with_override(AnomalyOverride::spike_at(10, Channel::Pressure));
        let (p, channel) = anomaly.at_step(10);
        assert_eq!(p.spike, 1.0);
        assert_eq!(p.dropout, 0.0);
        assert_eq!(channel, Some(Channel::Pressure));

        let (p, channel) = anomaly.at_step(11);
        assert_eq!(p, AnomalyProbabilities::default());
        assert_eq!(channel, None);
    }

    #[test]
    fn test_timestamp() {
        let sim = SimulationConfig::default();
        assert_eq!(
            sim.timestamp(15)
                .unwrap()
                .format("%Y-%m-%dT%H:%M:%S%.3f")
                .to_string(),
            "2025-01-01T00:00:01.500"
        );
    }

    #[test]
    fn test_timestamp_overflow_rejected() {
        let mut config = TwinConfig::default().with_steps(3);
        config.simulation.dt = 1e13;
        assert_eq!(config.simulation.timestamp(2), None);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimestampOverflow { steps: 3, .. })
        ));

        assert_eq!(config.simulation.timestamp(usize::MAX), None);
    }

    #[test]
    fn test_sub_millisecond_step_rejected() {
        let mut config = TwinConfig::default();
        config.simulation.dt = 0.0125;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SubMillisecond { .. })
        ));

        config.simulation.dt = 0.0004;
        assert!(config.validate().is_err());

        config.simulation.dt = 0.005;
        assert!(config.validate().is_ok());
        assert_eq!(
            config.simulation.timestamp(7).unwrap(),
            config.simulation.epoch + Duration::milliseconds(35)
        );
    }

    #[test]
    fn test_saturated_window_rejected() {
        let mut config = TwinConfig::default();
        config.profile.valve_fault = Some(ValveFault {
            window: Window::Span {
                start: usize::MAX,
                end: usize::MAX,
            },
            factor: 0.5,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyWindow { .. })
        ));

        config.profile.valve_fault = None;
        config.profile.surge = Some(VoltageSurge {
            window: Window::Periodic {
                period: 400,
                after: usize::MAX,
            },
            delta_v: 1.0,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = TwinConfig::default()
            .with_seed(7)
            .with_termination(Termination::SafetyStop(SafetyLimits::default()));
        let file = NamedTempFile::new().unwrap();
        config.save(file.path()).unwrap();
        let loaded = TwinConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TwinConfig::from_json(r#"{ "simulation": { "steps": 50 } }"#).unwrap();
        assert_eq!(config.simulation.steps, 50);
        assert_eq!(config.simulation.dt, 0.1);
        assert_eq!(config.noise, NoiseConfig::default());
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        let err = TwinConfig::from_json(r#"{ "simulation": { "dt": -1.0 } }"#).unwrap_err();
        assert!(err.to_string().contains("simulation.dt"));
    }
}
