//! IRT parameter batch
//!
//! Recalibrates every question with responses. Only empirical estimates are
//! persisted; callers needing parameters for an uncalibrated question get the
//! Bloom-level defaults from [`IrtService::effective_parameters`].

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info};

use mastery_algo::{
    BloomLevel, CalibrationMethod, IrtCalibrator, ItemResponse, QuestionIrtParameters,
};

use crate::services::EngineError;
use crate::store::{optional, RecordStore};

/// (discrimination, difficulty, guessing) by Bloom level 1..=6
const BLOOM_DEFAULTS: [(f64, f64, f64); 6] = [
    (1.0, -1.5, 0.25),
    (1.0, -0.75, 0.20),
    (1.2, 0.0, 0.15),
    (1.2, 0.5, 0.10),
    (1.4, 1.0, 0.05),
    (1.4, 1.5, 0.0),
];

pub fn bloom_default_parameters(question_id: &str, level: BloomLevel) -> QuestionIrtParameters {
    let (discrimination, difficulty, guessing) = BLOOM_DEFAULTS[(level.get() - 1) as usize];
    QuestionIrtParameters {
        question_id: question_id.to_string(),
        discrimination,
        difficulty,
        guessing,
        p_correct: 0.0,
        sample_size: 0,
        unique_user_count: 0,
        calibration_method: CalibrationMethod::InsufficientData,
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrtBatchSummary {
    pub calibrated: usize,
    pub insufficient: usize,
    pub failed: usize,
    pub duration_secs: f64,
}

pub struct IrtService {
    store: Arc<dyn RecordStore>,
    calibrator: IrtCalibrator,
}

impl IrtService {
    pub fn new(store: Arc<dyn RecordStore>, calibrator: IrtCalibrator) -> Self {
        Self { store, calibrator }
    }

    pub fn calibrate_question(&self, question_id: &str) -> Result<QuestionIrtParameters, EngineError> {
        let responses: Vec<ItemResponse> = self
            .store
            .responses_for_question(question_id)?
            .into_iter()
            .map(|r| ItemResponse {
                user_id: r.user_id,
                is_correct: r.is_correct,
            })
            .collect();
        Ok(self.calibrator.calibrate_question(question_id, &responses))
    }

    pub fn recalibrate_all(&self) -> Result<IrtBatchSummary, EngineError> {
        let start = Instant::now();
        let questions = self.store.question_ids()?;
        info!(question_count = questions.len(), "Starting IRT calibration");

        let mut items: Vec<(String, Vec<ItemResponse>)> = Vec::with_capacity(questions.len());
        let mut summary = IrtBatchSummary::default();
        for question_id in questions {
            match self.store.responses_for_question(&question_id) {
                Ok(responses) => {
                    let responses = responses
                        .into_iter()
                        .map(|r| ItemResponse {
                            user_id: r.user_id,
                            is_correct: r.is_correct,
                        })
                        .collect();
                    items.push((question_id, responses));
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(question_id = %question_id, error = %e, "Failed to load item responses");
                }
            }
        }

        for params in self.calibrator.calibrate_batch(&items) {
            if !params.is_empirical() {
                summary.insufficient += 1;
                debug!(
                    question_id = %params.question_id,
                    sample_size = params.sample_size,
                    unique_users = params.unique_user_count,
                    "Insufficient data for IRT calibration"
                );
                continue;
            }
            let question_id = params.question_id.clone();
            match self.store.put_irt_parameters(params) {
                Ok(()) => summary.calibrated += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(question_id = %question_id, error = %e, "Failed to persist IRT parameters");
                }
            }
        }

        summary.duration_secs = start.elapsed().as_secs_f64();
        info!(
            calibrated = summary.calibrated,
            insufficient = summary.insufficient,
            failed = summary.failed,
            duration_secs = format!("{:.2}", summary.duration_secs),
            "IRT calibration completed"
        );
        Ok(summary)
    }

    /// Stored empirical parameters, else the Bloom-level defaults
    pub fn effective_parameters(
        &self,
        question_id: &str,
        level: BloomLevel,
    ) -> Result<QuestionIrtParameters, EngineError> {
        Ok(optional(self.store.get_irt_parameters(question_id))?
            .filter(QuestionIrtParameters::is_empirical)
            .unwrap_or_else(|| bloom_default_parameters(question_id, level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_within_bounds() {
        for level in BloomLevel::all() {
            let params = bloom_default_parameters("q", level);
            assert!((0.5..=2.5).contains(&params.discrimination));
            assert!((-3.0..=3.0).contains(&params.difficulty));
            assert!((0.0..=0.25).contains(&params.guessing));
            assert!(!params.is_empirical());
        }
    }

    #[test]
    fn test_defaults_harder_with_level() {
        let easy = bloom_default_parameters("q", BloomLevel::REMEMBER);
        let hard = bloom_default_parameters("q", BloomLevel::CREATE);
        assert!(hard.difficulty > easy.difficulty);
    }
}
