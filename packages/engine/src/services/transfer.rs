//! Knowledge transfer and keystone queries against the graph service
//!
//! Graph failures surface as [`EngineError::Graph`]; degrading on outage is
//! the caller's decision.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use mastery_algo::{
    aggregate_transfer, infer_transfer, keystone_scores, recommend_starting_level, KeystoneScore,
    StartingRecommendation, TransferEdge, TRANSFER_SOURCE_MIN_MASTERY,
};

use crate::graph::{GraphError, GraphService};
use crate::services::EngineError;
use crate::store::RecordStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEstimate {
    pub topic_id: String,
    /// Capped aggregate boost, percentage points
    pub estimated_mastery: f64,
    pub sources: Vec<TransferEdge>,
    pub recommendation: StartingRecommendation,
}

pub struct TransferService {
    store: Arc<dyn RecordStore>,
    graph: Arc<dyn GraphService>,
}

impl TransferService {
    pub fn new(store: Arc<dyn RecordStore>, graph: Arc<dyn GraphService>) -> Self {
        Self { store, graph }
    }

    pub fn infer_for_topic(&self, source_topic: &str, source_mastery: f64) -> Result<Vec<TransferEdge>, EngineError> {
        if source_mastery.is_nan() || source_mastery < TRANSFER_SOURCE_MIN_MASTERY {
            return Ok(Vec::new());
        }
        let related = self.graph.related_topics(source_topic)?;
        Ok(infer_transfer(source_topic, source_mastery, &related))
    }

    /// Best mastery per topic across Bloom levels and chapters
    fn topic_mastery(&self, user_id: &str) -> Result<BTreeMap<String, f64>, EngineError> {
        let mut best: BTreeMap<String, f64> = BTreeMap::new();
        for record in self.store.masteries_for_user(user_id)? {
            if record.questions_attempted == 0 {
                continue;
            }
            best.entry(record.key.topic_id.clone())
                .and_modify(|m| *m = m.max(record.mastery_score))
                .or_insert(record.mastery_score);
        }
        Ok(best)
    }

    /// Every edge from a mastered source into a topic the user has not attempted
    pub fn edges_into_unattempted(&self, user_id: &str) -> Result<Vec<TransferEdge>, EngineError> {
        let mastery = self.topic_mastery(user_id)?;
        let attempted: BTreeSet<&str> = mastery.keys().map(String::as_str).collect();

        let mut edges = Vec::new();
        for (topic, &score) in &mastery {
            if score < TRANSFER_SOURCE_MIN_MASTERY {
                continue;
            }
            match self.infer_for_topic(topic, score) {
                Ok(found) => edges.extend(
                    found
                        .into_iter()
                        .filter(|e| !attempted.contains(e.target_topic.as_str())),
                ),
                Err(EngineError::Graph(GraphError::TopicNotFound(missing))) => {
                    debug!(topic_id = %missing, "Mastered topic not in graph");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(edges)
    }

    /// Aggregate estimate for one topic, capped at 40
    pub fn aggregate_for(&self, user_id: &str, topic_id: &str) -> Result<f64, EngineError> {
        let edges = self.edges_into(user_id, topic_id)?;
        Ok(aggregate_transfer(&edges).get(topic_id).copied().unwrap_or(0.0))
    }

    fn edges_into(&self, user_id: &str, topic_id: &str) -> Result<Vec<TransferEdge>, EngineError> {
        let mastery = self.topic_mastery(user_id)?;
        let mut edges = Vec::new();
        for (topic, &score) in &mastery {
            if topic == topic_id || score < TRANSFER_SOURCE_MIN_MASTERY {
                continue;
            }
            match self.infer_for_topic(topic, score) {
                Ok(found) => edges.extend(found.into_iter().filter(|e| e.target_topic == topic_id)),
                Err(EngineError::Graph(GraphError::TopicNotFound(_))) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(edges)
    }

    /// Estimates and starting levels for every never-attempted reachable topic
    pub fn estimate_for_unattempted(&self, user_id: &str) -> Result<Vec<TransferEstimate>, EngineError> {
        let edges = self.edges_into_unattempted(user_id)?;
        let totals = aggregate_transfer(&edges);

        let mut sources: BTreeMap<&str, Vec<TransferEdge>> = BTreeMap::new();
        for edge in &edges {
            sources
                .entry(edge.target_topic.as_str())
                .or_default()
                .push(edge.clone());
        }

        Ok(totals
            .into_iter()
            .map(|(topic_id, estimated_mastery)| TransferEstimate {
                sources: sources.remove(topic_id.as_str()).unwrap_or_default(),
                recommendation: recommend_starting_level(estimated_mastery),
                topic_id,
                estimated_mastery,
            })
            .collect())
    }

    pub fn keystone_score(&self, topic_id: &str) -> Result<KeystoneScore, EngineError> {
        let count = self.graph.dependent_count(topic_id)?;
        Ok(KeystoneScore::new(topic_id, count))
    }

    pub fn keystone_boost(&self, topic_id: &str) -> Result<f64, EngineError> {
        Ok(self.keystone_score(topic_id)?.priority_boost())
    }

    /// All topics, most dependents first
    pub fn keystone_ranking(&self) -> Result<Vec<KeystoneScore>, EngineError> {
        let graph = self.graph.prerequisite_graph().map_err(|e| {
            warn!(error = %e, "Prerequisite graph unavailable for keystone ranking");
            e
        })?;
        Ok(keystone_scores(&graph))
    }
}
