// Pump Twin Sim - Anomaly injection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Stochastic measurement corruption.
//!
//! Three anomaly kinds, checked in a fixed order every step:
//!
//! 1. **Dropout**: the whole sample is lost, nothing else happens.
//! 2. **Spike**: one random channel is multiplied by `1 ± spike_mult`.
//! 3. **Drift**: once triggered it stays on for the rest of the run, and
//!    every channel receives a signed random-walk offset each step.
//!
//! Overrides change the probabilities at single steps but never the number
//! or order of random draws for a given outcome.

use crate::context::DriftState;
use pumptwin::{AnomalyConfig, Channel, Labels, Measurement};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Measurement after injection, with its ground-truth labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    /// `None` when the sample dropped out.
    pub measurement: Option<Measurement>,
    pub labels: Labels,
}

/// Applies the configured anomalies to measurements.
#[derive(Debug, Clone)]
pub struct AnomalyInjector {
    config: AnomalyConfig,
}

impl AnomalyInjector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Corrupt one measurement.
    pub fn inject<R: Rng + ?Sized>(
        &self,
        step: usize,
        mut measurement: Measurement,
        rng: &mut R,
        drift: &mut DriftState,
    ) -> Injection {
        let (p, pinned_channel) = self.config.at_step(step);
        let mut labels = Labels::default();

        if rng.gen::<f64>() < p.dropout {
            return Injection {
                measurement: None,
                labels: Labels::dropout(),
            };
        }

        if rng.gen::<f64>() < p.spike {
            labels.spike = true;
            let drawn = Channel::ALL[rng.gen_range(0..Channel::ALL.len())];
            let channel = pinned_channel.unwrap_or(drawn);
            let sign = random_sign(rng);
            *measurement.get_mut(channel) *= 1.0 + sign * self.config.spike_mult;
        }

        if drift.is_active() || rng.gen::<f64>() < p.drift {
            drift.activate();
            labels.drift = true;
            for channel in Channel::ALL {
                let increment = random_sign(rng) * self.config.drift_per_step;
                let offset = drift.accumulate(channel, increment);
                *measurement.get_mut(channel) += offset;
            }
        }

        Injection {
            measurement: Some(measurement),
            labels,
        }
    }
}

fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    if rng.gen::<f64>() < 0.5 {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pumptwin::{AnomalyOverride, AnomalyProbabilities};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> Measurement {
        Measurement::from_values([40.0, 30.0, 10.0, 77.0, 0.5])
    }

    fn injector(probabilities: AnomalyProbabilities) -> AnomalyInjector {
        AnomalyInjector::new(AnomalyConfig {
            probabilities,
            ..Default::default()
        })
    }

    #[test]
    fn test_no_anomalies_passes_through() {
        let injector = injector(AnomalyProbabilities::none());
        let mut rng = StdRng::seed_from_u64(1);
        let mut drift = DriftState::new();

        for step in 0..500 {
            let out = injector.inject(step, sample(), &mut rng, &mut drift);
            assert_eq!(out.measurement, Some(sample()));
            assert!(!out.labels.any());
        }
        assert!(!drift.is_active());
    }

    #[test]
    fn test_certain_dropout() {
        let injector = injector(AnomalyProbabilities {
            dropout: 1.0,
            spike: 1.0,
            drift: 1.0,
        });
        let mut rng = StdRng::seed_from_u64(2);
        let mut drift = DriftState::new();

        let out = injector.inject(0, sample(), &mut rng, &mut drift);
        assert_eq!(out.measurement, None);
        assert_eq!(out.labels, Labels::dropout());
        // Dropout returns before the drift check
        assert!(!drift.is_active());
    }

    #[test]
    fn test_spike_multiplies_one_channel() {
        let injector = injector(AnomalyProbabilities {
            spike: 1.0,
            ..AnomalyProbabilities::none()
        });
        let mut rng = StdRng::seed_from_u64(3);
        let mut drift = DriftState::new();

        for step in 0..50 {
            let out = injector.inject(step, sample(), &mut rng, &mut drift);
            let m = out.measurement.unwrap();
            assert!(out.labels.spike);

            let changed: Vec<Channel> = Channel::ALL
                .into_iter()
                .filter(|c| m.get(*c) != sample().get(*c))
                .collect();
            assert_eq!(changed.len(), 1);

            let c = changed[0];
            let ratio = m.get(c) / sample().get(c);
            assert!(
                (ratio - 4.0).abs() < 1e-12 || (ratio + 2.0).abs() < 1e-12,
                "ratio {}",
                ratio
            );
        }
    }

    #[test]
    fn test_pinned_spike_channel() {
        let config = AnomalyConfig {
            probabilities: AnomalyProbabilities::none(),
            ..Default::default()
        }
        .with_override(AnomalyOverride::spike_at(10, Channel::Pressure));
        let injector = AnomalyInjector::new(config);
        let mut rng = StdRng::seed_from_u64(4);
        let mut drift = DriftState::new();

        let out = injector.inject(10, sample(), &mut rng, &mut drift);
        let m = out.measurement.unwrap();
        assert!(out.labels.spike);
        let p = m.pressure;
        assert!(p == 77.0 * 4.0 || p == 77.0 * -2.0);
        assert_eq!(m.flow, 10.0);

        let out = injector.inject(11, sample(), &mut rng, &mut drift);
        assert!(!out.labels.any());
    }

    #[test]
    fn test_drift_is_sticky() {
        let config = AnomalyConfig {
            probabilities: AnomalyProbabilities::none(),
            ..Default::default()
        }
        .with_override(AnomalyOverride {
            step: 5,
            drift: Some(1.0),
            ..Default::default()
        });
        let injector = AnomalyInjector::new(config);
        let mut rng = StdRng::seed_from_u64(5);
        let mut drift = DriftState::new();

        let mut labelled = Vec::new();
        for step in 0..100 {
            let out = injector.inject(step, sample(), &mut rng, &mut drift);
            labelled.push(out.labels.drift);
        }
        assert!(labelled[..5].iter().all(|d| !d));
        assert!(labelled[5..].iter().all(|d| *d));
    }

    #[test]
    fn test_drift_offsets_are_steps_of_fixed_size() {
        let injector = injector(AnomalyProbabilities {
            drift: 1.0,
            ..AnomalyProbabilities::none()
        });
        let mut rng = StdRng::seed_from_u64(6);
        let mut drift = DriftState::new();

        let out = injector.inject(0, sample(), &mut rng, &mut drift);
        let m = out.measurement.unwrap();
        for c in Channel::ALL {
            assert_relative_eq!((m.get(c) - sample().get(c)).abs(), 0.002, epsilon = 1e-9);
            assert_relative_eq!(drift.offset(c).abs(), 0.002, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_same_seed_same_injections() {
        let injector = injector(AnomalyProbabilities {
            spike: 0.2,
            drift: 0.01,
            dropout: 0.1,
        });
        let run = || {
            let mut rng = StdRng::seed_from_u64(99);
            let mut drift = DriftState::new();
            (0..300)
                .map(|step| injector.inject(step, sample(), &mut rng, &mut drift))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
