//! Scalar Kalman filter with identity transition and observation.
//!
//! With `F = H = 1` and no control term, `predict` only inflates the error
//! covariance and `update` blends the reading into the estimate.

use crate::config::KalmanParams;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};

/// Filter state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarKalman {
    /// State estimate.
    estimate: f64,
    /// Error covariance.
    covariance: f64,
    /// Process variance Q.
    process_var: f64,
    /// Measurement variance R.
    measurement_var: f64,
}

impl ScalarKalman {
    /// Create a filter at `initial_estimate`.
    pub fn new(initial_estimate: f64, params: &KalmanParams) -> Result<Self, FilterError> {
        check_variance("process", params.process_var)?;
        check_variance("measurement", params.measurement_var)?;
        check_variance("initial", params.initial_covariance)?;
        if params.initial_covariance + params.process_var + params.measurement_var == 0.0 {
            return Err(FilterError::Degenerate);
        }

        Ok(Self {
            estimate: initial_estimate,
            covariance: params.initial_covariance,
            process_var: params.process_var,
            measurement_var: params.measurement_var,
        })
    }

    /// Time update: `P <- P + Q`. The estimate is unchanged.
    pub fn predict(&mut self) -> f64 {
        self.covariance += self.process_var;
        self.estimate
    }

    /// Measurement update with reading `z`. Returns the new estimate.
    pub fn update(&mut self, z: f64) -> f64 {
        let gain = self.gain();
        // With K = 1 the estimate is the reading, bit for bit.
        self.estimate = if gain == 1.0 {
            z
        } else {
            self.estimate + gain * (z - self.estimate)
        };
        self.covariance *= 1.0 - gain;
        self.estimate
    }

    /// Predict then update.
    pub fn step(&mut self, z: f64) -> f64 {
        self.predict();
        self.update(z)
    }

    /// Kalman gain for the current covariance.
    pub fn gain(&self) -> f64 {
        let denom = self.covariance + self.measurement_var;
        if denom == 0.0 {
            1.0
        } else {
            self.covariance / denom
        }
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn covariance(&self) -> f64 {
        self.covariance
    }
}

fn check_variance(name: &'static str, value: f64) -> Result<(), FilterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FilterError::InvalidVariance { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(q: f64, r: f64) -> KalmanParams {
        KalmanParams {
            process_var: q,
            measurement_var: r,
            initial_covariance: 1.0,
        }
    }

    #[test]
    fn test_predict_inflates_covariance() {
        let mut kf = ScalarKalman::new(5.0, &params(0.1, 0.01)).unwrap();
        let x = kf.predict();
        assert_eq!(x, 5.0);
        assert_relative_eq!(kf.covariance(), 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_update_formula() {
        let mut kf = ScalarKalman::new(0.0, &params(1e-3, 1.0)).unwrap();
        // P = 1, R = 1 -> K = 0.5
        let x = kf.update(10.0);
        assert_relative_eq!(x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(kf.covariance(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_measurement_variance_tracks_exactly() {
        let mut kf = ScalarKalman::new(3.0, &params(1e-3, 0.0)).unwrap();
        for z in [7.25, -1.5, 1e6, 0.125] {
            kf.predict();
            assert_eq!(kf.update(z), z);
        }
    }

    #[test]
    fn test_converges_on_constant_signal() {
        let mut kf = ScalarKalman::new(0.0, &params(1e-3, 1e-2)).unwrap();
        for _ in 0..100 {
            kf.step(42.0);
        }
        assert_relative_eq!(kf.estimate(), 42.0, epsilon = 1e-6);
        assert!(kf.gain() > 0.0 && kf.gain() < 1.0);
    }

    #[test]
    fn test_negative_variance_rejected() {
        assert_eq!(
            ScalarKalman::new(0.0, &params(-1.0, 0.01)),
            Err(FilterError::InvalidVariance {
                name: "process",
                value: -1.0
            })
        );
        assert!(ScalarKalman::new(0.0, &params(1e-3, f64::NAN)).is_err());
    }

    #[test]
    fn test_all_zero_variances_rejected() {
        let p = KalmanParams {
            process_var: 0.0,
            measurement_var: 0.0,
            initial_covariance: 0.0,
        };
        assert_eq!(ScalarKalman::new(0.0, &p), Err(FilterError::Degenerate));
    }
}
