//! Spaced Repetition Scheduler
//!
//! Maps the normalized calibration score of the response just graded onto a
//! review interval through a fixed, versioned tier table. The selected tier is
//! the one with the highest threshold ≤ the score, so a score sitting exactly
//! on a threshold belongs to that threshold's tier.
//!
//! Tier boundaries are a policy artifact tuned from observed score
//! combinations; change them by publishing a new table version rather than
//! editing thresholds in place.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::sanitize::clamp_finite;

pub const DEFAULT_TABLE_VERSION: &str = "2026.1";

/// (threshold, hours), ascending
const DEFAULT_TIERS: [(f64, u32); 24] = [
    (0.00, 4),
    (0.10, 6),
    (0.17, 8),
    (0.23, 12),
    (0.30, 16),
    (0.35, 20),
    (0.40, 24),
    (0.45, 30),
    (0.50, 36),
    (0.53, 42),
    (0.57, 48),
    (0.60, 60),
    (0.63, 72),
    (0.67, 84),
    (0.70, 96),
    (0.73, 120),
    (0.77, 144),
    (0.80, 168),
    (0.83, 192),
    (0.87, 216),
    (0.90, 240),
    (0.93, 264),
    (0.97, 300),
    (1.00, 336),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalTier {
    pub threshold: f64,
    pub hours: u32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntervalTableError {
    #[error("interval table has no tiers")]
    Empty,
    #[error("first tier threshold must be 0.0, got {0}")]
    FirstThreshold(f64),
    #[error("tier {index} threshold {threshold} is not above the previous tier or outside [0, 1]")]
    Threshold { index: usize, threshold: f64 },
    #[error("tier {index} interval {hours}h is shorter than the previous tier")]
    NotMonotonic { index: usize, hours: u32 },
}

/// Deserialization goes through [`IntervalTable::new`], so a loaded table is
/// always validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIntervalTable")]
pub struct IntervalTable {
    pub version: String,
    tiers: Vec<IntervalTier>,
}

#[derive(Deserialize)]
struct RawIntervalTable {
    version: String,
    tiers: Vec<IntervalTier>,
}

impl TryFrom<RawIntervalTable> for IntervalTable {
    type Error = IntervalTableError;

    fn try_from(raw: RawIntervalTable) -> Result<Self, Self::Error> {
        Self::new(raw.version, raw.tiers)
    }
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self {
            version: DEFAULT_TABLE_VERSION.to_string(),
            tiers: DEFAULT_TIERS
                .iter()
                .map(|&(threshold, hours)| IntervalTier { threshold, hours })
                .collect(),
        }
    }
}

impl IntervalTable {
    pub fn new(version: impl Into<String>, tiers: Vec<IntervalTier>) -> Result<Self, IntervalTableError> {
        let table = Self {
            version: version.into(),
            tiers,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), IntervalTableError> {
        let first = self.tiers.first().ok_or(IntervalTableError::Empty)?;
        if first.threshold != 0.0 {
            return Err(IntervalTableError::FirstThreshold(first.threshold));
        }
        for (index, pair) in self.tiers.windows(2).enumerate() {
            let (prev, tier) = (pair[0], pair[1]);
            if !(tier.threshold > prev.threshold && tier.threshold <= 1.0) {
                return Err(IntervalTableError::Threshold {
                    index: index + 1,
                    threshold: tier.threshold,
                });
            }
            if tier.hours < prev.hours {
                return Err(IntervalTableError::NotMonotonic {
                    index: index + 1,
                    hours: tier.hours,
                });
            }
        }
        Ok(())
    }

    pub fn tiers(&self) -> &[IntervalTier] {
        &self.tiers
    }

    /// 0-based index of the tier selected for `normalized`
    pub fn tier_index(&self, normalized: f64) -> usize {
        let score = clamp_finite(normalized, 0.0, 1.0, 0.0);
        self.tiers
            .partition_point(|tier| tier.threshold <= score)
            .saturating_sub(1)
    }

    pub fn interval_hours(&self, normalized: f64) -> u32 {
        self.tiers[self.tier_index(normalized)].hours
    }

    pub fn next_review_at(&self, normalized: f64, reviewed_at: DateTime<Utc>) -> DateTime<Utc> {
        reviewed_at + Duration::hours(i64::from(self.interval_hours(normalized)))
    }

    /// Build the schedule record for one graded review
    pub fn schedule(
        &self,
        user_id: &str,
        question_id: &str,
        normalized: f64,
        reviewed_at: DateTime<Utc>,
    ) -> ReviewSchedule {
        let interval_hours = self.interval_hours(normalized);
        ReviewSchedule {
            user_id: user_id.to_string(),
            question_id: question_id.to_string(),
            last_reviewed_at: reviewed_at,
            next_review_at: reviewed_at + Duration::hours(i64::from(interval_hours)),
            interval_hours,
            normalized_calibration: normalized,
            table_version: self.version.clone(),
        }
    }
}

/// Next-exposure record for one (user, question)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSchedule {
    pub user_id: String,
    pub question_id: String,
    pub last_reviewed_at: DateTime<Utc>,
    pub next_review_at: DateTime<Utc>,
    pub interval_hours: u32,
    pub normalized_calibration: f64,
    pub table_version: String,
}

impl ReviewSchedule {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_at
    }
}
