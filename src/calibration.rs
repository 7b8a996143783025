//! Linear calibration of raw scores onto the ground-truth scale.
//!
//! Ordinary least squares with one feature:
//!
//! ```text
//! slope     = cov(raw, truth) / var(raw)
//! intercept = mean(truth) - slope * mean(raw)
//! ```
//!
//! When every raw score is identical the slope is undefined. The fit then
//! degrades to the constant model `y = mean(truth)` and is flagged as
//! degenerate rather than failing, so a scorer that only ever emits its
//! fallback still produces a complete (if uninformative) run.

use serde::Serialize;
use tracing::warn;

use crate::evaluation::is_constant;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalibrationError {
    #[error("raw scores ({raw}) and ground truth ({truth}) differ in length")]
    LengthMismatch { raw: usize, truth: usize },
    #[error("cannot calibrate on zero samples")]
    Empty,
    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },
}

/// Fitted `y = slope * x + intercept` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearCalibration {
    pub slope: f64,
    pub intercept: f64,
    /// Raw scores were constant; the model is `y = intercept`.
    pub degenerate: bool,
    /// Root-mean-square error on the fitting data.
    pub training_rmse: f64,
    /// Number of samples fitted.
    pub n: usize,
}

impl LinearCalibration {
    /// The mapping that leaves scores unchanged.
    pub fn identity() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
            degenerate: false,
            training_rmse: 0.0,
            n: 0,
        }
    }

    pub fn fit(raw: &[f64], truth: &[f64]) -> Result<Self, CalibrationError> {
        if raw.len() != truth.len() {
            return Err(CalibrationError::LengthMismatch {
                raw: raw.len(),
                truth: truth.len(),
            });
        }
        if raw.is_empty() {
            return Err(CalibrationError::Empty);
        }
        if let Some(index) = raw
            .iter()
            .zip(truth)
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(CalibrationError::NonFinite { index });
        }

        let n = raw.len();
        let nf = n as f64;
        let mean_x = raw.iter().sum::<f64>() / nf;
        let mean_y = truth.iter().sum::<f64>() / nf;

        let (mut cov, mut var_x) = (0.0, 0.0);
        for (x, y) in raw.iter().zip(truth) {
            let dx = x - mean_x;
            cov += dx * (y - mean_y);
            var_x += dx * dx;
        }

        let mut calibration = if is_constant(raw) || var_x == 0.0 {
            warn!(n, mean_raw = mean_x, "raw scores are constant; calibrating to the ground-truth mean");
            Self {
                slope: 0.0,
                intercept: mean_y,
                degenerate: true,
                training_rmse: 0.0,
                n,
            }
        } else {
            let slope = cov / var_x;
            Self {
                slope,
                intercept: mean_y - slope * mean_x,
                degenerate: false,
                training_rmse: 0.0,
                n,
            }
        };

        let sse: f64 = calibration.residuals(raw, truth).map(|r| r * r).sum();
        calibration.training_rmse = (sse / nf).sqrt();
        Ok(calibration)
    }

    pub fn predict(&self, raw: f64) -> f64 {
        self.slope * raw + self.intercept
    }

    /// Map every raw score, preserving order and length.
    pub fn apply(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter().map(|&x| self.predict(x)).collect()
    }

    /// `truth - predict(raw)` for each pair.
    pub fn residuals<'a>(
        &'a self,
        raw: &'a [f64],
        truth: &'a [f64],
    ) -> impl Iterator<Item = f64> + 'a {
        raw.iter().zip(truth).map(move |(&x, &y)| y - self.predict(x))
    }
}
