//! Mastery Update Engine
//!
//! Folds a chronological response stream into a [`TopicMastery`] record.
//!
//! Two update paths:
//! - **Reward decomposition**: `quality = (calibration + recognition) / 2`,
//!   scaled by a per-Bloom-level multiplier and added to the running score.
//! - **EMA fallback** for responses without a decomposition:
//!   `mastery = α·(100 | 0) + (1 − α)·mastery`.
//!
//! The fold is not commutative. Replaying the same responses in a different
//! order yields a different score, so every replay sorts by `answered_at`
//! first and single-step folds reject responses older than the last one
//! folded.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{BloomLevel, MasteryKey, Response, TopicMastery, MASTERY_MAX, MASTERY_MIN};

const DEFAULT_EMA_ALPHA: f64 = 0.3;

/// Per-Bloom-level multiplier applied to the quality score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloomMultiplierTable {
    /// Indexed by bloom level − 1
    multipliers: [f64; 6],
}

impl Default for BloomMultiplierTable {
    fn default() -> Self {
        Self {
            multipliers: [10.0, 10.0, 10.0, 9.0, 9.0, 9.0],
        }
    }
}

impl BloomMultiplierTable {
    pub fn new(multipliers: [f64; 6]) -> Self {
        Self { multipliers }
    }

    pub fn multiplier(&self, level: BloomLevel) -> f64 {
        self.multipliers[(level.get() - 1) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryParams {
    pub ema_alpha: f64,
    pub bloom_multipliers: BloomMultiplierTable,
}

impl Default for MasteryParams {
    fn default() -> Self {
        Self {
            ema_alpha: DEFAULT_EMA_ALPHA,
            bloom_multipliers: BloomMultiplierTable::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePath {
    RewardDecomposition,
    /// Response carried no reward components
    EmaFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryUpdate {
    pub mastery: TopicMastery,
    pub path: UpdatePath,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MasteryError {
    #[error("response at {received} is older than last folded response at {last_folded} for {key}")]
    OrderingViolation {
        key: MasteryKey,
        last_folded: DateTime<Utc>,
        received: DateTime<Utc>,
    },
    #[error("response for {received} cannot be folded into {expected}")]
    KeyMismatch {
        expected: MasteryKey,
        received: MasteryKey,
    },
}

/// Stable sort by `answered_at`; equal timestamps keep input order
pub fn sort_chronologically(responses: &mut [Response]) {
    responses.sort_by_key(|r| r.answered_at);
}

#[derive(Debug, Clone, Default)]
pub struct MasteryUpdateEngine {
    params: MasteryParams,
}

impl MasteryUpdateEngine {
    pub fn new(params: MasteryParams) -> Self {
        Self { params }
    }

    /// One fold step. No ordering check; see [`Self::fold`].
    pub fn update_mastery(&self, prior: &TopicMastery, response: &Response) -> MasteryUpdate {
        let (score, path) = match response.reward_components {
            Some(components) => {
                let multiplier = self.params.bloom_multipliers.multiplier(response.bloom_level);
                (
                    prior.mastery_score + components.quality() * multiplier,
                    UpdatePath::RewardDecomposition,
                )
            }
            None => {
                let alpha = self.params.ema_alpha;
                let target = if response.is_correct { 100.0 } else { 0.0 };
                (
                    alpha * target + (1.0 - alpha) * prior.mastery_score,
                    UpdatePath::EmaFallback,
                )
            }
        };

        let score = if score.is_finite() {
            score.clamp(MASTERY_MIN, MASTERY_MAX)
        } else {
            prior.mastery_score
        };

        let questions_attempted = prior.questions_attempted.saturating_add(1);
        let mastery = TopicMastery {
            key: prior.key.clone(),
            mastery_score: score,
            questions_attempted,
            questions_correct: prior
                .questions_correct
                .saturating_add(u32::from(response.is_correct))
                .min(questions_attempted),
            last_practiced_at: Some(
                prior
                    .last_practiced_at
                    .map_or(response.answered_at, |last| last.max(response.answered_at)),
            ),
        };

        MasteryUpdate {
            delta: mastery.mastery_score - prior.mastery_score,
            mastery,
            path,
        }
    }

    /// Fold one live response, rejecting mismatched keys and out-of-order timestamps
    pub fn fold(&self, prior: &TopicMastery, response: &Response) -> Result<MasteryUpdate, MasteryError> {
        let received = response.key();
        if received != prior.key {
            return Err(MasteryError::KeyMismatch {
                expected: prior.key.clone(),
                received,
            });
        }
        if let Some(last_folded) = prior.last_practiced_at {
            if response.answered_at < last_folded {
                return Err(MasteryError::OrderingViolation {
                    key: received,
                    last_folded,
                    received: response.answered_at,
                });
            }
        }
        Ok(self.update_mastery(prior, response))
    }

    /// Mastery after each response, oldest first
    pub fn trajectory(&self, key: &MasteryKey, responses: &[Response]) -> Vec<f64> {
        let mut ordered: Vec<Response> = responses
            .iter()
            .filter(|r| r.key() == *key)
            .cloned()
            .collect();
        sort_chronologically(&mut ordered);

        let mut state = TopicMastery::new(key.clone());
        ordered
            .iter()
            .map(|response| {
                state = self.update_mastery(&state, response).mastery;
                state.mastery_score
            })
            .collect()
    }

    /// Rebuild one key from scratch. Responses for other keys are ignored.
    pub fn replay(&self, key: &MasteryKey, responses: &[Response]) -> TopicMastery {
        let mut ordered: Vec<&Response> = responses.iter().filter(|r| r.key() == *key).collect();
        ordered.sort_by_key(|r| r.answered_at);

        ordered
            .into_iter()
            .fold(TopicMastery::new(key.clone()), |state, response| {
                self.update_mastery(&state, response).mastery
            })
    }

    /// Rebuild every key present in `responses`, each key independently
    pub fn replay_all(&self, responses: &[Response]) -> BTreeMap<MasteryKey, TopicMastery> {
        let mut grouped: BTreeMap<MasteryKey, Vec<&Response>> = BTreeMap::new();
        for response in responses {
            grouped.entry(response.key()).or_default().push(response);
        }

        grouped
            .into_par_iter()
            .map(|(key, mut group)| {
                group.sort_by_key(|r| r.answered_at);
                let state = group
                    .into_iter()
                    .fold(TopicMastery::new(key.clone()), |state, response| {
                        self.update_mastery(&state, response).mastery
                    });
                (key, state)
            })
            .collect()
    }
}
