//! Knowledge Transfer Inferencer
//!
//! Infers partial mastery of graph-related topics from one mastered topic.
//! Each relationship kind has a linear ramp `base + (mastery − 70) / divisor`
//! capped at a kind-specific maximum. Contributions from several sources into
//! one target are summed and capped at [`TRANSFER_TOTAL_CAP`].

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{BloomLevel, TRANSFER_SOURCE_MIN_MASTERY, TRANSFER_TOTAL_CAP};

const MAX_COUSINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Sibling,
    Cousin,
    Parent,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferRule {
    pub base: f64,
    pub cap: f64,
    pub divisor: f64,
}

impl RelationshipKind {
    pub fn rule(self) -> TransferRule {
        match self {
            Self::Sibling => TransferRule { base: 15.0, cap: 25.0, divisor: 3.0 },
            Self::Cousin => TransferRule { base: 8.0, cap: 15.0, divisor: 4.0 },
            Self::Parent => TransferRule { base: 10.0, cap: 18.0, divisor: 3.5 },
            Self::Child => TransferRule { base: 5.0, cap: 12.0, divisor: 5.0 },
        }
    }
}

impl TransferRule {
    pub fn boost(&self, source_mastery: f64) -> f64 {
        let above = (source_mastery - TRANSFER_SOURCE_MIN_MASTERY).max(0.0);
        (self.base + above / self.divisor).min(self.cap)
    }
}

/// Graph neighbourhood of a topic as returned by the graph service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedTopics {
    pub siblings: Vec<String>,
    pub cousins: Vec<String>,
    pub parents: Vec<String>,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEdge {
    pub source_topic: String,
    pub target_topic: String,
    pub relationship: RelationshipKind,
    /// Percentage points of inferred mastery
    pub boost: f64,
}

pub fn infer_transfer(source_topic: &str, source_mastery: f64, related: &RelatedTopics) -> Vec<TransferEdge> {
    if source_mastery.is_nan() || source_mastery < TRANSFER_SOURCE_MIN_MASTERY {
        return Vec::new();
    }

    let groups: [(RelationshipKind, &[String]); 4] = [
        (RelationshipKind::Sibling, &related.siblings),
        (RelationshipKind::Cousin, &related.cousins[..related.cousins.len().min(MAX_COUSINS)]),
        (RelationshipKind::Parent, &related.parents),
        (RelationshipKind::Child, &related.children),
    ];

    // a topic listed under several kinds keeps its strongest edge
    let mut strongest: HashMap<&str, TransferEdge> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (kind, topics) in groups {
        let boost = kind.rule().boost(source_mastery);
        for target in topics {
            if target == source_topic {
                continue;
            }
            match strongest.entry(target.as_str()) {
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    if existing.boost < boost {
                        existing.relationship = kind;
                        existing.boost = boost;
                    }
                }
                Entry::Vacant(slot) => {
                    order.push(target.as_str());
                    slot.insert(TransferEdge {
                        source_topic: source_topic.to_string(),
                        target_topic: target.clone(),
                        relationship: kind,
                        boost,
                    });
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|target| strongest.remove(target))
        .collect()
}

/// Sum per target, capped at 40
pub fn aggregate_transfer<'a>(edges: impl IntoIterator<Item = &'a TransferEdge>) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for edge in edges {
        *totals.entry(edge.target_topic.clone()).or_insert(0.0) += edge.boost;
    }
    for total in totals.values_mut() {
        *total = total.min(TRANSFER_TOTAL_CAP);
    }
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingNote {
    StrongTransfer,
    PartialTransfer,
    ColdStart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingRecommendation {
    pub bloom_level: BloomLevel,
    pub estimated_mastery: f64,
    pub note: StartingNote,
}

pub fn recommend_starting_level(aggregate: f64) -> StartingRecommendation {
    let (bloom_level, note) = if aggregate >= 30.0 {
        (BloomLevel::UNDERSTAND, StartingNote::StrongTransfer)
    } else if aggregate >= 15.0 {
        (BloomLevel::REMEMBER, StartingNote::PartialTransfer)
    } else {
        (BloomLevel::REMEMBER, StartingNote::ColdStart)
    };
    StartingRecommendation {
        bloom_level,
        estimated_mastery: aggregate.clamp(0.0, TRANSFER_TOTAL_CAP),
        note,
    }
}
