//! Calibration Normalizer
//!
//! Transforms between the raw signed calibration score ([-1.5, 1.5], 0 is
//! perfectly calibrated), the normalized [0, 1] score consumed by the
//! scheduler, a practice priority and a qualitative status.

use serde::{Deserialize, Serialize};

use crate::sanitize::{clamp_finite, round_to};
use crate::types::{RAW_CALIBRATION_MAX, RAW_CALIBRATION_MIN};

const RAW_SPAN: f64 = RAW_CALIBRATION_MAX - RAW_CALIBRATION_MIN;
const NORMALIZED_DECIMALS: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationLevel {
    Critical,
    Poor,
    Developing,
    Fair,
    Good,
    Excellent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationStatus {
    pub level: CalibrationLevel,
    pub label: &'static str,
    pub description: &'static str,
}

/// Ordered status buckets, highest threshold first
const STATUS_BUCKETS: [(f64, CalibrationLevel, &str, &str); 5] = [
    (
        1.0,
        CalibrationLevel::Excellent,
        "Excellent",
        "Confidence closely tracks correctness; trust in self-assessment is well founded.",
    ),
    (
        0.5,
        CalibrationLevel::Good,
        "Good",
        "Confidence usually matches outcomes with occasional misjudgements.",
    ),
    (
        0.0,
        CalibrationLevel::Fair,
        "Fair",
        "Confidence and correctness agree about as often as they disagree.",
    ),
    (
        -0.5,
        CalibrationLevel::Developing,
        "Developing",
        "Confidence often overshoots actual performance; calibration practice recommended.",
    ),
    (
        -1.0,
        CalibrationLevel::Poor,
        "Poor",
        "Frequent high-confidence errors; review fundamentals before advancing.",
    ),
];

const CRITICAL_LABEL: &str = "Critical";
const CRITICAL_DESCRIPTION: &str =
    "Severe overconfidence: most confident answers are wrong. Prioritize calibration work.";

fn clamp_raw(raw: f64) -> f64 {
    clamp_finite(raw, RAW_CALIBRATION_MIN, RAW_CALIBRATION_MAX, 0.0)
}

/// Map raw [-1.5, 1.5] onto [0, 1]
pub fn normalize(raw: f64) -> f64 {
    let clamped = clamp_raw(raw);
    round_to((clamped - RAW_CALIBRATION_MIN) / RAW_SPAN, NORMALIZED_DECIMALS)
}

/// Inverse of [`normalize`]
pub fn denormalize(normalized: f64) -> f64 {
    let clamped = clamp_finite(normalized, 0.0, 1.0, 0.5);
    round_to(clamped * RAW_SPAN + RAW_CALIBRATION_MIN, NORMALIZED_DECIMALS)
}

/// Higher for more overconfident learners, in [0, 1]
pub fn priority(raw: f64) -> f64 {
    (RAW_CALIBRATION_MAX - clamp_raw(raw)) / RAW_SPAN
}

pub fn status(raw: f64) -> CalibrationStatus {
    let clamped = clamp_raw(raw);
    for (threshold, level, label, description) in STATUS_BUCKETS {
        if clamped >= threshold {
            return CalibrationStatus {
                level,
                label,
                description,
            };
        }
    }
    CalibrationStatus {
        level: CalibrationLevel::Critical,
        label: CRITICAL_LABEL,
        description: CRITICAL_DESCRIPTION,
    }
}

/// Lift a reward-decomposition calibration component ([-1, 1]) onto the raw scale
pub fn raw_from_component(component: f64) -> f64 {
    clamp_raw(component * RAW_CALIBRATION_MAX)
}
