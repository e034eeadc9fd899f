use std::sync::Arc;

use serde::Serialize;

use mastery_algo::{calibration, trend, CalibrationStatus, Response, TrendMetrics};

use crate::services::responses::raw_calibration_of;
use crate::services::EngineError;
use crate::store::RecordStore;

/// Calibration metrics for a user, optionally narrowed to one topic
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReport {
    pub user_id: String,
    pub topic_id: Option<String>,
    /// Trend over raw calibration scores, oldest first
    pub metrics: TrendMetrics,
    /// `None` until at least one response carries a calibration signal
    pub normalized_mean: Option<f64>,
    pub status: Option<CalibrationStatus>,
    pub priority: Option<f64>,
    /// Responses without any calibration signal
    pub skipped: usize,
}

pub struct CalibrationService {
    store: Arc<dyn RecordStore>,
}

impl CalibrationService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Recomputed from the ordered history on every call
    pub fn calibration_metrics(
        &self,
        user_id: &str,
        topic_id: Option<&str>,
    ) -> Result<CalibrationReport, EngineError> {
        let mut history: Vec<Response> = self
            .store
            .responses_for_user(user_id)?
            .into_iter()
            .filter(|r| topic_id.map_or(true, |t| r.topic_id == t))
            .collect();
        history.sort_by_key(|r| r.answered_at);

        let scores: Vec<f64> = history.iter().filter_map(raw_calibration_of).collect();
        let metrics = trend::analyze(&scores);
        let mean = (metrics.count > 0).then_some(metrics.mean);

        Ok(CalibrationReport {
            user_id: user_id.to_string(),
            topic_id: topic_id.map(str::to_string),
            normalized_mean: mean.map(calibration::normalize),
            status: mean.map(calibration::status),
            priority: mean.map(calibration::priority),
            skipped: history.len() - scores.len(),
            metrics,
        })
    }
}
