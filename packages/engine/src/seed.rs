//! JSON seed for the in-memory store and graph

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use mastery_algo::{RelatedTopics, Response};

use crate::graph::MemoryGraph;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteEdge {
    pub topic: String,
    pub prerequisite: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteEdge>,
    /// Explicit neighbourhoods that override derived ones
    #[serde(default)]
    pub related: BTreeMap<String, RelatedTopics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub responses_loaded: usize,
    pub responses_rejected: usize,
    pub edges_loaded: usize,
}

pub async fn load_seed(path: &Path) -> Result<SeedData, SeedError> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Responses without an id get a fresh one. Invalid or duplicate responses are
/// skipped; mastery is left for a recompute.
pub fn apply_seed(seed: SeedData, store: &dyn RecordStore, graph: &MemoryGraph) -> Result<SeedStats, SeedError> {
    let mut stats = SeedStats::default();

    for edge in &seed.prerequisites {
        graph.add_prerequisite(&edge.topic, &edge.prerequisite);
        stats.edges_loaded += 1;
    }
    for (topic, related) in seed.related {
        graph.set_related(&topic, related);
    }

    for mut response in seed.responses {
        if response.id.is_empty() {
            response.id = Uuid::new_v4().to_string();
        }
        if let Err(e) = response.validate() {
            warn!(response_id = %response.id, error = %e, "Skipping invalid seed response");
            stats.responses_rejected += 1;
            continue;
        }
        match store.append_response(response) {
            Ok(()) => stats.responses_loaded += 1,
            Err(StoreError::DuplicateResponse(id)) => {
                warn!(response_id = %id, "Skipping duplicate seed response");
                stats.responses_rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        responses_loaded = stats.responses_loaded,
        responses_rejected = stats.responses_rejected,
        edges_loaded = stats.edges_loaded,
        "Seed data applied"
    );
    Ok(stats)
}
