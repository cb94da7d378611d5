// Pump Twin Sim - Core generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Closed-loop dataset generation.
//!
//! Each step runs, in order: input profile, state update, measurement,
//! shared calibration drift, per-channel sensor noise, anomaly injection.
//! Every random draw comes from the run's single seeded stream in that
//! order, so a seed and a config fully determine the output.

use crate::anomaly::{AnomalyInjector, Injection};
use crate::context::SimContext;
use crate::dataset::Dataset;
use crate::error::SimError;
use crate::profile::InputProfile;
use crate::safety::{SafetySupervisor, StopEvent};
use log::{debug, info, warn};
use pumptwin::{
    Channel, ConfigError, DatasetRow, Measurement, Termination, TwinConfig, TwinModel, TwinState,
};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Result of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub dataset: Dataset,
    /// True state after each emitted row's update.
    pub states: Vec<TwinState>,
    /// Last true state.
    pub final_state: TwinState,
    /// Set when the safety supervisor ended the run early.
    pub stop: Option<StopEvent>,
}

impl GenerationReport {
    pub fn rows(&self) -> &[DatasetRow] {
        self.dataset.rows()
    }

    pub fn stopped_early(&self) -> bool {
        self.stop.is_some()
    }
}

/// Drives the twin and the sensor chain over the configured steps.
#[derive(Debug, Clone)]
pub struct TwinGenerator {
    config: TwinConfig,
    model: TwinModel,
    profile: InputProfile,
    injector: AnomalyInjector,
    noise: [Normal<f64>; 5],
    shared_drift_step: Normal<f64>,
}

impl TwinGenerator {
    /// Validate the config and build the generator.
    pub fn new(config: TwinConfig) -> Result<Self, SimError> {
        config.validate()?;

        let n = &config.noise;
        let noise = [
            Normal::new(0.0, n.sigma(Channel::Omega))?,
            Normal::new(0.0, n.sigma(Channel::Temperature))?,
            Normal::new(0.0, n.sigma(Channel::Flow))?,
            Normal::new(0.0, n.sigma(Channel::Pressure))?,
            Normal::new(0.0, n.sigma(Channel::Vibration))?,
        ];
        let shared_drift_step = Normal::new(0.0, n.shared_drift_step)?;

        Ok(Self {
            model: TwinModel::new(config.plant.clone()),
            profile: InputProfile::new(config.profile.clone())?,
            injector: AnomalyInjector::new(config.anomaly.clone()),
            noise,
            shared_drift_step,
            config,
        })
    }

    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    pub fn model(&self) -> &TwinModel {
        &self.model
    }

    /// Run with a fresh context seeded from the config.
    pub fn run(&self) -> Result<GenerationReport, SimError> {
        let mut ctx = SimContext::new(self.config.simulation.seed);
        self.run_with_context(&mut ctx)
    }

    /// Run against a caller-owned context.
    pub fn run_with_context(&self, ctx: &mut SimContext) -> Result<GenerationReport, SimError> {
        let sim = &self.config.simulation;
        info!(
            "Generating up to {} steps (dt={}, seed={})",
            sim.steps, sim.dt, sim.seed
        );

        let mut supervisor = match &sim.termination {
            Termination::RunToCompletion => None,
            Termination::SafetyStop(limits) => Some(SafetySupervisor::new(limits.clone())?),
        };

        let mut dataset = Dataset::new();
        let mut states = Vec::with_capacity(sim.steps);
        let mut x = sim.initial_state;
        let mut stop = None;

        for step in 0..sim.steps {
            let u = self.profile.input_at(step, ctx.rng());
            x = self.model.fx(&x, &u, sim.dt);
            let clean = self.model.hx(&x, &u);
            let Injection {
                measurement,
                labels,
            } = self.sense(step, clean, ctx);

            let timestamp = sim
                .timestamp(step)
                .ok_or_else(|| ConfigError::TimestampOverflow {
                    steps: sim.steps,
                    dt: sim.dt,
                    epoch: sim.epoch.to_string(),
                })?;
            let row = DatasetRow {
                step,
                timestamp,
                input: u,
                measurement,
                labels,
            };

            let event = match supervisor.as_mut() {
                Some(s) => s.observe(step, row.measurement.as_ref())?,
                None => None,
            };

            dataset.push(row);
            states.push(x);

            if let Some(event) = event {
                warn!("Safety stop at {}", event);
                stop = Some(event);
                break;
            }
        }

        let counts = dataset.label_counts();
        info!(
            "Generated {} rows: {} spike, {} drift, {} dropout",
            dataset.len(),
            counts.spike,
            counts.drift,
            counts.dropout
        );
        debug!("Final state: {:?}", x);

        Ok(GenerationReport {
            dataset,
            states,
            final_state: x,
            stop,
        })
    }

    /// Shared drift, sensor noise and anomaly injection for one measurement.
    fn sense(&self, step: usize, mut m: Measurement, ctx: &mut SimContext) -> Injection {
        let increment = self.shared_drift_step.sample(ctx.rng());
        let shared = ctx.advance_shared_drift(increment);
        let noise = &self.config.noise;
        for channel in Channel::CONTINUOUS {
            let scale = ctx
                .rng()
                .gen_range(noise.shared_drift_scale_low..noise.shared_drift_scale_high);
            *m.get_mut(channel) += shared * scale;
        }

        for channel in Channel::ALL {
            *m.get_mut(channel) += self.noise[channel.index()].sample(ctx.rng());
        }

        let (rng, drift) = ctx.parts_mut();
        self.injector.inject(step, m, rng, drift)
    }
}

/// Build a generator for `config` and run it once.
pub fn generate(config: &TwinConfig) -> Result<GenerationReport, SimError> {
    TwinGenerator::new(config.clone())?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pumptwin::SafetyLimits;

    fn short_config() -> TwinConfig {
        TwinConfig::default().with_steps(300)
    }

    #[test]
    fn test_row_count_and_timestamps() {
        let report = generate(&short_config()).unwrap();
        assert_eq!(report.rows().len(), 300);
        assert_eq!(report.states.len(), 300);
        assert!(!report.stopped_early());

        for (i, row) in report.rows().iter().enumerate() {
            assert_eq!(row.step, i);
        }
        let last = &report.rows()[299];
        assert_eq!(
            last.timestamp.format(pumptwin::TIMESTAMP_FORMAT).to_string(),
            "2025-01-01T00:00:29.900"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = short_config();
        config.simulation.steps = 0;
        let err = TwinGenerator::new(config).unwrap_err();
        assert!(matches!(
            err,
            SimError::Config(ConfigError::ZeroCount { .. })
        ));
    }

    #[test]
    fn test_unrepresentable_timestamps_rejected() {
        let mut config = TwinConfig::default().with_steps(3);
        config.simulation.dt = 1e13;
        let err = generate(&config).unwrap_err();
        assert!(matches!(
            err,
            SimError::Config(ConfigError::TimestampOverflow { steps: 3, .. })
        ));
    }

    #[test]
    fn test_final_state_matches_last_state() {
        let report = generate(&short_config()).unwrap();
        assert_eq!(report.states.last(), Some(&report.final_state));
    }

    #[test]
    fn test_silent_run_matches_model() {
        let mut config = short_config().without_anomalies();
        config.noise = pumptwin::NoiseConfig::silent();
        config.profile = pumptwin::ProfileConfig::constant(24.0, 1.0, 0.8);
        let report = generate(&config).unwrap();

        let model = TwinModel::new(config.plant.clone());
        for (row, x) in report.rows().iter().zip(&report.states) {
            assert_eq!(row.measurement, Some(model.hx(x, &row.input)));
        }
    }

    #[test]
    fn test_safety_stop_keeps_triggering_row() {
        let limits = SafetyLimits {
            max_speed: 20.0,
            ..Default::default()
        };
        let config = short_config().with_termination(Termination::SafetyStop(limits));
        let report = generate(&config).unwrap();

        let stop = report.stop.unwrap();
        assert_eq!(stop.reason, crate::StopReason::Overspeed);
        assert_eq!(report.rows().last().map(|r| r.step), Some(stop.step));
        assert_eq!(report.rows().len(), stop.step + 1);
    }
}
