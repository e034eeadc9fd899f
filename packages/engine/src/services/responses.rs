//! Live response processing
//!
//! One response runs validate → lock key → read prior → fold → schedule →
//! commit. The key lock is held from the read to the commit, and the commit is
//! a single store call, so a failure at any step leaves prior state intact.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mastery_algo::{
    calibration, compute_reward, IntervalTable, MasteryError, MasteryUpdateEngine, Response,
    ReviewSchedule, TopicMastery, UpdatePath,
};

use crate::config::OrderingPolicy;
use crate::services::locks::KeyLocks;
use crate::services::EngineError;
use crate::store::{optional, RecordStore, ResponseCommit};

/// Normalized calibration used when a response carries no calibration signal
pub const NEUTRAL_NORMALIZED_CALIBRATION: f64 = 0.5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    /// Stored id, assigned here when the response arrived without one
    pub response_id: String,
    pub reward: f64,
    pub mastery: TopicMastery,
    pub path: UpdatePath,
    /// Schedule in effect after this response
    pub schedule: ReviewSchedule,
    /// The key's history was re-sorted and replayed
    pub replayed: bool,
}

/// Raw calibration of one response: explicit score, else lifted from the
/// reward decomposition
pub fn raw_calibration_of(response: &Response) -> Option<f64> {
    response.raw_calibration.or_else(|| {
        response
            .reward_components
            .map(|c| calibration::raw_from_component(c.calibration))
    })
}

pub fn normalized_calibration_of(response: &Response) -> f64 {
    raw_calibration_of(response)
        .map(calibration::normalize)
        .unwrap_or(NEUTRAL_NORMALIZED_CALIBRATION)
}

pub struct ResponseProcessor {
    store: Arc<dyn RecordStore>,
    locks: Arc<KeyLocks>,
    engine: MasteryUpdateEngine,
    table: Arc<IntervalTable>,
    policy: OrderingPolicy,
}

impl ResponseProcessor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        locks: Arc<KeyLocks>,
        engine: MasteryUpdateEngine,
        table: Arc<IntervalTable>,
        policy: OrderingPolicy,
    ) -> Self {
        Self {
            store,
            locks,
            engine,
            table,
            policy,
        }
    }

    pub async fn process(&self, mut response: Response) -> Result<ProcessOutcome, EngineError> {
        response.validate()?;
        if response.id.is_empty() {
            response.id = Uuid::new_v4().to_string();
        }

        let key = response.key();
        let _guard = self.locks.lock(&key).await;

        let prior = optional(self.store.get_mastery(&key))?
            .unwrap_or_else(|| TopicMastery::new(key.clone()));

        let reward = compute_reward(response.is_correct, response.confidence, response.latency_secs);

        let (mastery, path, replayed) = match self.engine.fold(&prior, &response) {
            Ok(update) => (update.mastery, update.path, false),
            Err(MasteryError::OrderingViolation {
                last_folded, received, ..
            }) if self.policy == OrderingPolicy::Replay => {
                warn!(
                    key = %key,
                    last_folded = %last_folded,
                    received = %received,
                    "Out-of-order response, replaying key history"
                );
                let mut history = self.store.responses_for_key(&key)?;
                history.push(response.clone());
                let mastery = self.engine.replay(&key, &history);
                let path = if response.reward_components.is_some() {
                    UpdatePath::RewardDecomposition
                } else {
                    UpdatePath::EmaFallback
                };
                (mastery, path, true)
            }
            Err(e) => return Err(e.into()),
        };

        if path == UpdatePath::EmaFallback {
            debug!(key = %key, response_id = %response.id, "No reward components, EMA fallback");
        }

        let candidate = self.table.schedule(
            &response.user_id,
            &response.question_id,
            normalized_calibration_of(&response),
            response.answered_at,
        );
        let existing = optional(
            self.store
                .get_review_schedule(&response.user_id, &response.question_id),
        )?;
        // a late-arriving older review never moves a newer schedule
        let (schedule, write_schedule) = match existing {
            Some(current) if current.last_reviewed_at > response.answered_at => (current, false),
            _ => (candidate, true),
        };

        self.store.commit_response(ResponseCommit {
            response: response.clone(),
            mastery: mastery.clone(),
            schedule: write_schedule.then(|| schedule.clone()),
        })?;

        info!(
            key = %key,
            response_id = %response.id,
            reward = reward,
            mastery = mastery.mastery_score,
            interval_hours = schedule.interval_hours,
            replayed = replayed,
            "Response processed"
        );

        Ok(ProcessOutcome {
            response_id: response.id,
            reward,
            mastery,
            path,
            schedule,
            replayed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mastery_algo::{BloomLevel, Confidence, RewardComponents};

    fn response() -> Response {
        Response {
            id: "r1".into(),
            user_id: "u1".into(),
            topic_id: "t".into(),
            question_id: "q".into(),
            chapter_id: None,
            bloom_level: BloomLevel::REMEMBER,
            is_correct: true,
            confidence: Confidence::new(3).unwrap(),
            latency_secs: 10.0,
            reward_components: None,
            raw_calibration: None,
            answered_at: Utc::now(),
        }
    }

    #[test]
    fn test_explicit_raw_calibration_wins() {
        let mut r = response();
        r.raw_calibration = Some(-0.3);
        r.reward_components = Some(RewardComponents {
            calibration: 1.0,
            recognition: 1.0,
        });
        assert_eq!(raw_calibration_of(&r), Some(-0.3));
    }

    #[test]
    fn test_component_lifted_to_raw_scale() {
        let mut r = response();
        r.reward_components = Some(RewardComponents {
            calibration: -1.0,
            recognition: 0.5,
        });
        assert_eq!(raw_calibration_of(&r), Some(-1.5));
        assert_eq!(normalized_calibration_of(&r), 0.0);
    }

    #[test]
    fn test_neutral_without_signal() {
        assert_eq!(raw_calibration_of(&response()), None);
        assert_eq!(normalized_calibration_of(&response()), NEUTRAL_NORMALIZED_CALIBRATION);
    }
}
