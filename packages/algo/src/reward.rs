//! Reward Calculator
//!
//! Turns a single graded response into a scalar reward in [-1, 1].
//!
//! The reward has three parts: a base for correctness, a confidence
//! calibration adjustment and a latency adjustment. Inputs are assumed to be
//! range-validated already.

use serde::{Deserialize, Serialize};

use crate::types::Confidence;

const BASE_CORRECT: f64 = 1.0;
const BASE_INCORRECT: f64 = -0.5;

const CORRECT_HIGH_CONFIDENCE: f64 = 0.2;
const CORRECT_LOW_CONFIDENCE: f64 = -0.1;
const INCORRECT_HIGH_CONFIDENCE: f64 = -0.3;
const INCORRECT_LOW_CONFIDENCE: f64 = 0.1;

const SLOW_LATENCY_SECS: f64 = 180.0;
const SLOW_PENALTY: f64 = -0.1;
const FAST_LATENCY_SECS: f64 = 30.0;
const FAST_BONUS: f64 = 0.1;

/// Per-part reward, for explanation surfaces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBreakdown {
    pub base: f64,
    pub calibration_adjustment: f64,
    pub latency_adjustment: f64,
    /// Sum of the parts clamped to [-1, 1]
    pub total: f64,
}

pub fn reward_breakdown(is_correct: bool, confidence: Confidence, latency_secs: f64) -> RewardBreakdown {
    let base = if is_correct { BASE_CORRECT } else { BASE_INCORRECT };

    let calibration_adjustment = match (is_correct, confidence.is_high(), confidence.is_low()) {
        (true, true, _) => CORRECT_HIGH_CONFIDENCE,
        (true, _, true) => CORRECT_LOW_CONFIDENCE,
        (false, true, _) => INCORRECT_HIGH_CONFIDENCE,
        (false, _, true) => INCORRECT_LOW_CONFIDENCE,
        _ => 0.0,
    };

    let mut latency_adjustment = 0.0;
    if latency_secs > SLOW_LATENCY_SECS {
        latency_adjustment += SLOW_PENALTY;
    }
    if is_correct && latency_secs < FAST_LATENCY_SECS {
        latency_adjustment += FAST_BONUS;
    }

    let total = (base + calibration_adjustment + latency_adjustment).clamp(-1.0, 1.0);

    RewardBreakdown {
        base,
        calibration_adjustment,
        latency_adjustment,
        total,
    }
}

pub fn compute_reward(is_correct: bool, confidence: Confidence, latency_secs: f64) -> f64 {
    reward_breakdown(is_correct, confidence, latency_secs).total
}
