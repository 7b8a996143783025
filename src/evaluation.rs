//! Evaluation of calibrated predictions against ground truth.
//!
//! Produces the Pearson correlation (the headline number), Spearman rank
//! correlation as a secondary check, and the sorted scatter series used by
//! the plot. A correlation that is mathematically undefined is reported as
//! [`Correlation::Undefined`] with the reason, never as 0 or NaN.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    TooFewSamples,
    ConstantPredictions,
    ConstantGroundTruth,
    NonFinite,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UndefinedReason::TooFewSamples => "fewer than two samples",
            UndefinedReason::ConstantPredictions => "constant predictions",
            UndefinedReason::ConstantGroundTruth => "constant ground truth",
            UndefinedReason::NonFinite => "non-finite values",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Correlation {
    Defined {
        value: f64,
        /// Two-sided p-value of the t-test for zero correlation; `None` when
        /// there are no degrees of freedom (n = 2).
        p_value: Option<f64>,
    },
    Undefined {
        reason: UndefinedReason,
    },
}

impl Correlation {
    pub fn value(&self) -> Option<f64> {
        match self {
            Correlation::Defined { value, .. } => Some(*value),
            Correlation::Undefined { .. } => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Correlation::Defined { .. })
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correlation::Defined { value, .. } => write!(f, "{value:.4}"),
            Correlation::Undefined { reason } => write!(f, "undefined ({reason})"),
        }
    }
}

/// One point of the scatter series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub prediction: f64,
    pub ground_truth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub n: usize,
    pub pearson: Correlation,
    pub spearman: Correlation,
    /// Ascending by prediction, ties broken by ground truth.
    #[serde(skip)]
    pub sorted_pairs: Vec<ScatterPoint>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvaluationError {
    #[error("predictions ({predictions}) and ground truth ({truth}) differ in length")]
    LengthMismatch { predictions: usize, truth: usize },
}

// =============================================================================
// Evaluation
// =============================================================================

pub fn evaluate(predictions: &[f64], ground_truth: &[f64]) -> Result<EvaluationResult, EvaluationError> {
    if predictions.len() != ground_truth.len() {
        return Err(EvaluationError::LengthMismatch {
            predictions: predictions.len(),
            truth: ground_truth.len(),
        });
    }

    let pearson = pearson(predictions, ground_truth);
    let spearman = if predictions.iter().chain(ground_truth).all(|v| v.is_finite()) {
        pearson_correlation(&ranks_with_ties(predictions), &ranks_with_ties(ground_truth))
    } else {
        Correlation::Undefined {
            reason: UndefinedReason::NonFinite,
        }
    };

    Ok(EvaluationResult {
        n: predictions.len(),
        pearson,
        spearman,
        sorted_pairs: sorted_scatter(predictions, ground_truth),
    })
}

/// Pearson correlation with explicit undefined cases.
pub fn pearson(predictions: &[f64], ground_truth: &[f64]) -> Correlation {
    if predictions.iter().chain(ground_truth).any(|v| !v.is_finite()) {
        return Correlation::Undefined {
            reason: UndefinedReason::NonFinite,
        };
    }
    pearson_correlation(predictions, ground_truth)
}

fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Correlation {
    let len = xs.len().min(ys.len());
    if len < 2 {
        return Correlation::Undefined {
            reason: UndefinedReason::TooFewSamples,
        };
    }
    let (xs, ys) = (&xs[..len], &ys[..len]);
    if is_constant(xs) {
        return Correlation::Undefined {
            reason: UndefinedReason::ConstantPredictions,
        };
    }
    if is_constant(ys) {
        return Correlation::Undefined {
            reason: UndefinedReason::ConstantGroundTruth,
        };
    }
    let n = len as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    // Spread too small to square in f64.
    if denom_x == 0.0 || denom_y == 0.0 {
        return Correlation::Undefined {
            reason: if denom_x == 0.0 {
                UndefinedReason::ConstantPredictions
            } else {
                UndefinedReason::ConstantGroundTruth
            },
        };
    }

    let r = (num / (denom_x * denom_y).sqrt()).clamp(-1.0, 1.0);
    Correlation::Defined {
        value: r,
        p_value: correlation_p_value(r, len),
    }
}

/// Every value equal. Scale plays no part: 1e-9 apart is still variation.
pub(crate) fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Two-sided p-value for `r` under H0: rho = 0, via `t = r * sqrt((n-2)/(1-r^2))`.
fn correlation_p_value(r: f64, n: usize) -> Option<f64> {
    if n < 3 {
        return None;
    }
    let df = (n - 2) as f64;
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return Some(0.0);
    }
    let t = r * (df / one_minus_r2).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

/// Average ranks (0-based); tied values share the mean of their positions.
fn ranks_with_ties(scores: &[f64]) -> Vec<f64> {
    let n = scores.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0usize;
    while i < n {
        let score = scores[indices[i]];
        let mut j = i + 1;
        while j < n && scores[indices[j]] == score {
            j += 1;
        }
        let avg_rank = (i + j - 1) as f64 / 2.0;
        for &idx in &indices[i..j] {
            ranks[idx] = avg_rank;
        }
        i = j;
    }
    ranks
}

/// Scatter series sorted by prediction, then ground truth. Stable, so
/// identical input always yields identical output.
pub fn sorted_scatter(predictions: &[f64], ground_truth: &[f64]) -> Vec<ScatterPoint> {
    let mut points: Vec<ScatterPoint> = predictions
        .iter()
        .zip(ground_truth)
        .map(|(&prediction, &ground_truth)| ScatterPoint {
            prediction,
            ground_truth,
        })
        .collect();
    points.sort_by(|a, b| match a.prediction.total_cmp(&b.prediction) {
        Ordering::Equal => a.ground_truth.total_cmp(&b.ground_truth),
        other => other,
    });
    points
}
