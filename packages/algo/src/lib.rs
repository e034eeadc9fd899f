//! # mastery-algo - adaptive mastery estimation core
//!
//! Pure Rust implementations of the learner-model algorithms:
//!
//! - **Reward** - correctness, confidence and latency to a scalar reward
//! - **Calibration** - raw / normalized calibration, priority and status
//! - **Mastery** - path-dependent mastery folding per (user, topic, Bloom level)
//! - **Trend** - least-squares slope, spread and R² over score series
//! - **Schedule** - calibration-driven spaced repetition tier table
//! - **IRT** - empirical item difficulty / discrimination / guessing
//! - **Transfer** - inferred mastery for graph-related topics
//! - **Keystone** - transitive dependent counts in the prerequisite graph
//! - **Progression** - advance / maintain / review / regress decisions
//!
//! ## Design
//!
//! - **No I/O** - storage and graph access live in the engine crate
//! - **Deterministic** - identical inputs give identical outputs
//! - **Data-driven thresholds** - tier tables and multipliers are values, not branches
//!
//! ## Example
//!
//! ```rust
//! use mastery_algo::{calibration, compute_reward, Confidence, IntervalTable};
//!
//! let reward = compute_reward(true, Confidence::new(5).unwrap(), 20.0);
//! assert_eq!(reward, 1.0);
//!
//! let table = IntervalTable::default();
//! assert_eq!(table.interval_hours(calibration::normalize(-1.5)), 4);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod calibration;
pub mod irt;
pub mod keystone;
pub mod mastery;
pub mod progression;
pub mod reward;
pub mod sanitize;
pub mod schedule;
pub mod transfer;
pub mod trend;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use calibration::{CalibrationLevel, CalibrationStatus};
pub use irt::{
    CalibrationMethod, IrtCalibrationParams, IrtCalibrator, ItemResponse, QuestionIrtParameters,
};
pub use keystone::{keystone_scores, KeystoneScore, PrerequisiteGraph};
pub use mastery::{
    BloomMultiplierTable, MasteryError, MasteryParams, MasteryUpdate, MasteryUpdateEngine,
    UpdatePath,
};
pub use progression::{
    ProgressionAction, ProgressionDecision, ProgressionEvaluator, ProgressionInput,
    ProgressionParams,
};
pub use reward::{compute_reward, reward_breakdown, RewardBreakdown};
pub use schedule::{IntervalTable, IntervalTableError, IntervalTier, ReviewSchedule};
pub use transfer::{
    aggregate_transfer, infer_transfer, recommend_starting_level, RelatedTopics,
    RelationshipKind, StartingNote, StartingRecommendation, TransferEdge,
};
pub use trend::{TrendDirection, TrendMetrics, TrendParams};
