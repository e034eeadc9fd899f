//! Trend Analyzer
//!
//! Closed-form least squares over an ordered score series. The index of each
//! score (0..n) is the x axis.

use serde::{Deserialize, Serialize};

use crate::sanitize::has_invalid_values;
use crate::types::EPSILON;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendParams {
    pub min_samples: usize,
    pub up_threshold: f64,
    pub down_threshold: f64,
    /// R² below this is treated as noise, not a trend
    pub min_r_squared: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            min_samples: 3,
            up_threshold: 0.02,
            down_threshold: -0.02,
            min_r_squared: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    Insufficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendMetrics {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl TrendMetrics {
    pub fn direction(&self, params: &TrendParams) -> TrendDirection {
        if self.count < params.min_samples.max(2) {
            return TrendDirection::Insufficient;
        }
        if self.r_squared < params.min_r_squared {
            return TrendDirection::Stable;
        }
        if self.slope > params.up_threshold {
            TrendDirection::Improving
        } else if self.slope < params.down_threshold {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }

    /// Fitted value at index `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Non-finite points are dropped before fitting
pub fn analyze(scores: &[f64]) -> TrendMetrics {
    if has_invalid_values(scores) {
        let finite: Vec<f64> = scores.iter().copied().filter(|y| y.is_finite()).collect();
        return analyze(&finite);
    }

    let n = scores.len();
    match n {
        0 => return TrendMetrics::default(),
        1 => {
            return TrendMetrics {
                count: 1,
                mean: scores[0],
                ..TrendMetrics::default()
            }
        }
        _ => {}
    }

    let nf = n as f64;
    let mean = scores.iter().sum::<f64>() / nf;
    let variance = scores.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / nf;
    let std_dev = variance.sqrt();

    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_xx: f64 = (0..n).map(|i| (i as f64).powi(2)).sum();
    let sum_y: f64 = scores.iter().sum();
    let sum_xy: f64 = scores.iter().enumerate().map(|(i, y)| i as f64 * y).sum();

    let denominator = nf * sum_xx - sum_x.powi(2);
    let slope = if denominator.abs() < EPSILON {
        0.0
    } else {
        (nf * sum_xy - sum_x * sum_y) / denominator
    };
    let intercept = (sum_y - slope * sum_x) / nf;

    let ss_tot = variance * nf;
    let r_squared = if ss_tot.abs() < EPSILON {
        0.0
    } else {
        let ss_res: f64 = scores
            .iter()
            .enumerate()
            .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2))
            .sum();
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    TrendMetrics {
        count: n,
        mean,
        std_dev,
        slope,
        intercept,
        r_squared,
    }
}
