//! IRT Calibrator
//!
//! Empirical item parameter estimation from aggregated responses.
//!
//! This is a classical-test-theory approximation of 3PL parameters, not
//! marginal maximum likelihood estimation:
//! - difficulty `b` comes from the logit of the observed proportion correct
//!   scaled by the normal-ogive constant 1.7,
//! - discrimination `a` peaks at p = 0.5 as a proxy for item information,
//! - guessing `c` is the proportion correct capped at 0.25.
//!
//! No ability estimates are used, so parameters absorb any skew in who
//! answered the item. Items below the sample or user-diversity thresholds are
//! reported as [`CalibrationMethod::InsufficientData`]; substituting defaults
//! is the caller's job.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const LOGIT_SCALE: f64 = 1.7;
const DIFFICULTY_MIN: f64 = -3.0;
const DIFFICULTY_MAX: f64 = 3.0;
const DISCRIMINATION_MIN: f64 = 0.5;
const DISCRIMINATION_MAX: f64 = 2.5;
const GUESSING_MAX: f64 = 0.25;
const CEILING_P: f64 = 0.99;
const FLOOR_P: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrtCalibrationParams {
    pub min_samples: usize,
    pub min_unique_users: usize,
}

impl Default for IrtCalibrationParams {
    fn default() -> Self {
        Self {
            min_samples: 30,
            min_unique_users: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    Empirical,
    InsufficientData,
}

/// One graded answer to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub user_id: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionIrtParameters {
    pub question_id: String,
    /// a ∈ [0.5, 2.5]
    pub discrimination: f64,
    /// b ∈ [-3, 3]
    pub difficulty: f64,
    /// c ∈ [0, 0.25]
    pub guessing: f64,
    pub p_correct: f64,
    pub sample_size: usize,
    pub unique_user_count: usize,
    pub calibration_method: CalibrationMethod,
}

impl QuestionIrtParameters {
    pub fn is_empirical(&self) -> bool {
        self.calibration_method == CalibrationMethod::Empirical
    }
}

/// 3PL item characteristic curve
pub fn probability_correct(theta: f64, params: &QuestionIrtParameters) -> f64 {
    let z = (LOGIT_SCALE * params.discrimination * (theta - params.difficulty)).clamp(-20.0, 20.0);
    params.guessing + (1.0 - params.guessing) / (1.0 + (-z).exp())
}

pub fn difficulty_from_p(p: f64) -> f64 {
    if p >= CEILING_P {
        DIFFICULTY_MIN
    } else if p <= FLOOR_P {
        DIFFICULTY_MAX
    } else {
        (-LOGIT_SCALE * (p / (1.0 - p)).ln()).clamp(DIFFICULTY_MIN, DIFFICULTY_MAX)
    }
}

pub fn discrimination_from_p(p: f64) -> f64 {
    (DISCRIMINATION_MIN + (p * (1.0 - p) / 0.25) * 2.0).clamp(DISCRIMINATION_MIN, DISCRIMINATION_MAX)
}

pub fn guessing_from_p(p: f64) -> f64 {
    p.clamp(0.0, GUESSING_MAX)
}

#[derive(Debug, Clone, Default)]
pub struct IrtCalibrator {
    params: IrtCalibrationParams,
}

impl IrtCalibrator {
    pub fn new(params: IrtCalibrationParams) -> Self {
        Self { params }
    }

    pub fn calibrate_question(&self, question_id: &str, responses: &[ItemResponse]) -> QuestionIrtParameters {
        let sample_size = responses.len();
        let unique_user_count = responses
            .iter()
            .map(|r| r.user_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let correct = responses.iter().filter(|r| r.is_correct).count();
        let p = if sample_size == 0 {
            0.0
        } else {
            correct as f64 / sample_size as f64
        };

        if sample_size < self.params.min_samples || unique_user_count < self.params.min_unique_users {
            return QuestionIrtParameters {
                question_id: question_id.to_string(),
                discrimination: 1.0,
                difficulty: 0.0,
                guessing: 0.0,
                p_correct: p,
                sample_size,
                unique_user_count,
                calibration_method: CalibrationMethod::InsufficientData,
            };
        }

        QuestionIrtParameters {
            question_id: question_id.to_string(),
            discrimination: discrimination_from_p(p),
            difficulty: difficulty_from_p(p),
            guessing: guessing_from_p(p),
            p_correct: p,
            sample_size,
            unique_user_count,
            calibration_method: CalibrationMethod::Empirical,
        }
    }

    /// Calibrate many items in parallel; output order follows input order
    pub fn calibrate_batch(&self, items: &[(String, Vec<ItemResponse>)]) -> Vec<QuestionIrtParameters> {
        items
            .par_iter()
            .map(|(question_id, responses)| self.calibrate_question(question_id, responses))
            .collect()
    }
}
