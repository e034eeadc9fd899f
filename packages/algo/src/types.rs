//! Common Types and Constants
//!
//! Shared data structures used across all algorithm modules.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Lower bound of a mastery score
pub const MASTERY_MIN: f64 = -100.0;

/// Upper bound of a mastery score
pub const MASTERY_MAX: f64 = 100.0;

/// Lower bound of a raw calibration score (severe overconfidence)
pub const RAW_CALIBRATION_MIN: f64 = -1.5;

/// Upper bound of a raw calibration score (severe underconfidence)
pub const RAW_CALIBRATION_MAX: f64 = 1.5;

/// Source mastery required before any knowledge transfer is inferred
pub const TRANSFER_SOURCE_MIN_MASTERY: f64 = 70.0;

/// Cap on the summed transfer boost any single target topic may receive
pub const TRANSFER_TOTAL_CAP: f64 = 40.0;

/// Transitive dependent count at which a topic is flagged keystone
pub const KEYSTONE_THRESHOLD: usize = 5;

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

// ==================== Validation ====================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("bloom level must be within 1..=6, got {0}")]
    BloomLevel(u8),
    #[error("confidence must be within 1..=5, got {0}")]
    Confidence(u8),
    #[error("latency must be finite and non-negative, got {0}")]
    Latency(f64),
    #[error("reward component {name} must be within [-1, 1], got {value}")]
    RewardComponent { name: &'static str, value: f64 },
    #[error("raw calibration must be finite, got {0}")]
    RawCalibration(f64),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

// ==================== Bloom Level ====================

/// Cognitive-complexity tier, 1 (Remember) through 6 (Create)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BloomLevel(u8);

impl BloomLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub const REMEMBER: BloomLevel = BloomLevel(1);
    pub const UNDERSTAND: BloomLevel = BloomLevel(2);
    pub const APPLY: BloomLevel = BloomLevel(3);
    pub const ANALYZE: BloomLevel = BloomLevel(4);
    pub const EVALUATE: BloomLevel = BloomLevel(5);
    pub const CREATE: BloomLevel = BloomLevel(6);

    pub fn new(level: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ValidationError::BloomLevel(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            1 => "Remember",
            2 => "Understand",
            3 => "Apply",
            4 => "Analyze",
            5 => "Evaluate",
            _ => "Create",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }

    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).and_then(|level| Self::new(level).ok())
    }

    pub fn is_top(self) -> bool {
        self.0 == Self::MAX
    }

    pub fn all() -> impl Iterator<Item = BloomLevel> {
        (Self::MIN..=Self::MAX).map(BloomLevel)
    }
}

impl TryFrom<u8> for BloomLevel {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BloomLevel> for u8 {
    fn from(level: BloomLevel) -> Self {
        level.0
    }
}

impl fmt::Display for BloomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{} {}", self.0, self.name())
    }
}

// ==================== Confidence ====================

/// Self-reported confidence, 1 (guessing) through 5 (certain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::Confidence(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_high(self) -> bool {
        self.0 >= 4
    }

    pub fn is_low(self) -> bool {
        self.0 <= 2
    }
}

impl TryFrom<u8> for Confidence {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

// ==================== Responses ====================

/// Reward decomposition attached to newer responses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardComponents {
    /// Confidence calibration component [-1, 1]
    pub calibration: f64,
    /// Recognition / recall component [-1, 1]
    pub recognition: f64,
}

impl RewardComponents {
    pub fn quality(&self) -> f64 {
        (self.calibration + self.recognition) / 2.0
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [("calibration", self.calibration), ("recognition", self.recognition)] {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(ValidationError::RewardComponent { name, value });
            }
        }
        Ok(())
    }
}

/// A graded answer. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub topic_id: String,
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,
    pub bloom_level: BloomLevel,
    pub is_correct: bool,
    pub confidence: Confidence,
    pub latency_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_components: Option<RewardComponents>,
    /// Signed calibration score of this answer, [-1.5, 1.5]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_calibration: Option<f64>,
    pub answered_at: DateTime<Utc>,
}

impl Response {
    pub fn key(&self) -> MasteryKey {
        MasteryKey {
            user_id: self.user_id.clone(),
            topic_id: self.topic_id.clone(),
            bloom_level: self.bloom_level,
            chapter_id: self.chapter_id.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.is_empty() {
            return Err(ValidationError::EmptyField("user_id"));
        }
        if self.topic_id.is_empty() {
            return Err(ValidationError::EmptyField("topic_id"));
        }
        if self.question_id.is_empty() {
            return Err(ValidationError::EmptyField("question_id"));
        }
        if !self.latency_secs.is_finite() || self.latency_secs < 0.0 {
            return Err(ValidationError::Latency(self.latency_secs));
        }
        if let Some(components) = &self.reward_components {
            components.validate()?;
        }
        if let Some(raw) = self.raw_calibration {
            if !raw.is_finite() {
                return Err(ValidationError::RawCalibration(raw));
            }
        }
        Ok(())
    }
}

// ==================== Mastery ====================

/// Identity of one mastery record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryKey {
    pub user_id: String,
    pub topic_id: String,
    pub bloom_level: BloomLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,
}

impl fmt::Display for MasteryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/L{}", self.user_id, self.topic_id, self.bloom_level.get())?;
        if let Some(chapter) = &self.chapter_id {
            write!(f, "/{chapter}")?;
        }
        Ok(())
    }
}

/// Accumulated mastery for one (user, topic, bloom level[, chapter])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMastery {
    pub key: MasteryKey,
    /// [-100, 100]
    pub mastery_score: f64,
    pub questions_attempted: u32,
    pub questions_correct: u32,
    /// Timestamp of the last folded response
    pub last_practiced_at: Option<DateTime<Utc>>,
}

impl TopicMastery {
    pub fn new(key: MasteryKey) -> Self {
        Self {
            key,
            mastery_score: 0.0,
            questions_attempted: 0,
            questions_correct: 0,
            last_practiced_at: None,
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.questions_attempted == 0 {
            return 0.0;
        }
        self.questions_correct as f64 / self.questions_attempted as f64
    }
}
