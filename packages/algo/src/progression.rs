//! Progression Evaluator
//!
//! Decision table over mastery, attempt count, trend and the optional graph
//! signals (transfer, keystone). Rules are checked in order:
//!
//! | # | Condition | Action |
//! |---|---|---|
//! | 1 | no attempts | Maintain |
//! | 2 | mastery ≤ regress threshold, trend not improving | Regress (Review at level 1) |
//! | 3 | trend declining | Review |
//! | 4 | attempts < minimum | Maintain |
//! | 5 | mastery ≥ advance threshold | Advance (Maintain at level 6) |
//! | 6 | otherwise | Maintain |
//!
//! Graph signals only adjust confidence and the reason text; they never change
//! the action, so evaluation without a graph service gives the same decision.

use serde::{Deserialize, Serialize};

use crate::keystone::KeystoneScore;
use crate::trend::{TrendDirection, TrendMetrics, TrendParams};
use crate::types::BloomLevel;

const TRANSFER_CONFIDENCE_BONUS: f64 = 0.05;
const KEYSTONE_CONFIDENCE_BONUS: f64 = 0.05;
const TRANSFER_SIGNAL_MIN: f64 = 15.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionParams {
    pub advance_threshold: f64,
    pub regress_threshold: f64,
    pub min_attempts: u32,
    pub trend: TrendParams,
}

impl Default for ProgressionParams {
    fn default() -> Self {
        Self {
            advance_threshold: 70.0,
            regress_threshold: -20.0,
            min_attempts: 5,
            trend: TrendParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressionAction {
    Advance,
    Maintain,
    Review,
    Regress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionInput {
    pub current_level: BloomLevel,
    pub mastery_score: f64,
    pub questions_attempted: u32,
    pub trend: TrendMetrics,
    /// Aggregate inferred transfer into this topic, when the graph is available
    #[serde(default)]
    pub transfer_boost: Option<f64>,
    #[serde(default)]
    pub keystone: Option<KeystoneScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionDecision {
    pub action: ProgressionAction,
    pub target_level: BloomLevel,
    /// [0, 1]
    pub confidence: f64,
    pub reason: String,
    pub trend_direction: TrendDirection,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressionEvaluator {
    params: ProgressionParams,
}

impl ProgressionEvaluator {
    pub fn new(params: ProgressionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ProgressionParams {
        &self.params
    }

    pub fn evaluate(&self, input: &ProgressionInput) -> ProgressionDecision {
        let params = &self.params;
        let level = input.current_level;
        let direction = input.trend.direction(&params.trend);

        if input.questions_attempted == 0 {
            return ProgressionDecision {
                action: ProgressionAction::Maintain,
                target_level: level,
                confidence: 0.0,
                reason: "no attempts recorded at this level".to_string(),
                trend_direction: direction,
            };
        }

        let base_confidence = self.base_confidence(input, direction);

        if input.mastery_score <= params.regress_threshold && direction != TrendDirection::Improving {
            let (action, target_level, reason) = match level.prev() {
                Some(lower) => (
                    ProgressionAction::Regress,
                    lower,
                    format!(
                        "mastery {:.1} at or below {:.1}; dropping to {}",
                        input.mastery_score,
                        params.regress_threshold,
                        lower.name()
                    ),
                ),
                None => (
                    ProgressionAction::Review,
                    level,
                    format!(
                        "mastery {:.1} at or below {:.1} at the lowest level; review",
                        input.mastery_score, params.regress_threshold
                    ),
                ),
            };
            return ProgressionDecision {
                action,
                target_level,
                confidence: base_confidence,
                reason,
                trend_direction: direction,
            };
        }

        if direction == TrendDirection::Declining {
            return ProgressionDecision {
                action: ProgressionAction::Review,
                target_level: level,
                confidence: base_confidence,
                reason: format!(
                    "declining trend (slope {:.3}, R² {:.2})",
                    input.trend.slope, input.trend.r_squared
                ),
                trend_direction: direction,
            };
        }

        if input.questions_attempted < params.min_attempts {
            return ProgressionDecision {
                action: ProgressionAction::Maintain,
                target_level: level,
                confidence: base_confidence,
                reason: format!(
                    "insufficient attempts ({} of {})",
                    input.questions_attempted, params.min_attempts
                ),
                trend_direction: direction,
            };
        }

        if input.mastery_score >= params.advance_threshold {
            let Some(next) = level.next() else {
                return ProgressionDecision {
                    action: ProgressionAction::Maintain,
                    target_level: level,
                    confidence: base_confidence,
                    reason: "already at the top level".to_string(),
                    trend_direction: direction,
                };
            };

            let mut confidence = base_confidence;
            let mut reason = format!(
                "mastery {:.1} reached {:.1}; advancing to {}",
                input.mastery_score,
                params.advance_threshold,
                next.name()
            );
            if let Some(boost) = input.transfer_boost.filter(|b| *b >= TRANSFER_SIGNAL_MIN) {
                confidence += TRANSFER_CONFIDENCE_BONUS;
                reason.push_str(&format!("; transfer support {boost:.1}"));
            }
            if let Some(keystone) = input.keystone.as_ref().filter(|k| k.is_keystone) {
                confidence += KEYSTONE_CONFIDENCE_BONUS;
                reason.push_str(&format!("; keystone with {} dependents", keystone.dependent_count));
            }

            return ProgressionDecision {
                action: ProgressionAction::Advance,
                target_level: next,
                confidence: confidence.clamp(0.0, 1.0),
                reason,
                trend_direction: direction,
            };
        }

        ProgressionDecision {
            action: ProgressionAction::Maintain,
            target_level: level,
            confidence: base_confidence,
            reason: format!(
                "mastery {:.1} below advance threshold {:.1}",
                input.mastery_score, params.advance_threshold
            ),
            trend_direction: direction,
        }
    }

    fn base_confidence(&self, input: &ProgressionInput, direction: TrendDirection) -> f64 {
        let needed = (self.params.min_attempts.max(1) * 2) as f64;
        let attempt_factor = (input.questions_attempted as f64 / needed).min(1.0);
        let trend_factor = match direction {
            TrendDirection::Insufficient => 0.5,
            _ => 0.5 + 0.5 * input.trend.r_squared.clamp(0.0, 1.0),
        };
        (attempt_factor * trend_factor).clamp(0.0, 1.0)
    }
}
