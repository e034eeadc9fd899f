//! Batch recomputation
//!
//! Replays every affected key from its stored, chronologically sorted
//! history. Users run concurrently; each key is rebuilt under its key lock so
//! live processing and the batch never interleave on one key. A failing user
//! or key is logged and counted, never fatal to the batch.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info};

use mastery_algo::{MasteryKey, MasteryUpdateEngine, Response, TopicMastery};

use crate::services::locks::KeyLocks;
use crate::services::EngineError;
use crate::store::{RecordStore, StoreError};

const ALL_USERS: &str = "*";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeSummary {
    pub records_updated: usize,
    pub users_processed: usize,
    pub users_failed: usize,
    pub keys_failed: usize,
    /// First updated records in key order
    pub preview: Vec<TopicMastery>,
    pub duration_secs: f64,
}

#[derive(Debug, Default)]
struct UserResult {
    updated: Vec<TopicMastery>,
    keys_failed: usize,
}

/// Holds a scope in the in-flight set until dropped
struct ScopeGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    scope: String,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.scope);
    }
}

pub struct Recomputer {
    store: Arc<dyn RecordStore>,
    locks: Arc<KeyLocks>,
    engine: MasteryUpdateEngine,
    concurrency: usize,
    preview_limit: usize,
    in_flight: Mutex<HashSet<String>>,
}

impl Recomputer {
    pub fn new(
        store: Arc<dyn RecordStore>,
        locks: Arc<KeyLocks>,
        engine: MasteryUpdateEngine,
        concurrency: usize,
        preview_limit: usize,
    ) -> Self {
        Self {
            store,
            locks,
            engine,
            concurrency: concurrency.max(1),
            preview_limit,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// A full run overlaps every scope; a user scope overlaps itself and a full run
    fn begin(&self, scope: Option<&str>) -> Result<ScopeGuard<'_>, EngineError> {
        let label = scope.unwrap_or(ALL_USERS).to_string();
        let mut in_flight = self.in_flight.lock();
        let overlaps = in_flight.contains(ALL_USERS)
            || in_flight.contains(&label)
            || (scope.is_none() && !in_flight.is_empty());
        if overlaps {
            return Err(EngineError::BatchInFlight(label));
        }
        in_flight.insert(label.clone());
        Ok(ScopeGuard {
            in_flight: &self.in_flight,
            scope: label,
        })
    }

    pub fn is_running(&self) -> bool {
        !self.in_flight.lock().is_empty()
    }

    /// Replay all users, or only `scope` when given
    pub async fn recompute_all(&self, scope: Option<&str>) -> Result<RecomputeSummary, EngineError> {
        let _scope = self.begin(scope)?;
        let start = Instant::now();

        let users = match scope {
            Some(user_id) => vec![user_id.to_string()],
            None => self.store.user_ids()?,
        };

        info!(
            scope = scope.unwrap_or(ALL_USERS),
            user_count = users.len(),
            "Starting mastery recomputation"
        );

        let results: Vec<(String, Result<UserResult, StoreError>)> = stream::iter(users)
            .map(|user_id| async move {
                let result = self.recompute_user(&user_id).await;
                (user_id, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = RecomputeSummary::default();
        let mut updated: Vec<TopicMastery> = Vec::new();
        for (user_id, result) in results {
            match result {
                Ok(user) => {
                    summary.users_processed += 1;
                    summary.keys_failed += user.keys_failed;
                    updated.extend(user.updated);
                }
                Err(e) => {
                    summary.users_failed += 1;
                    error!(user_id = %user_id, error = %e, "Failed to recompute user");
                }
            }
        }

        summary.records_updated = updated.len();
        updated.sort_by(|a, b| a.key.cmp(&b.key));
        updated.truncate(self.preview_limit);
        summary.preview = updated;
        summary.duration_secs = start.elapsed().as_secs_f64();

        info!(
            records_updated = summary.records_updated,
            users_processed = summary.users_processed,
            users_failed = summary.users_failed,
            keys_failed = summary.keys_failed,
            duration_secs = format!("{:.2}", summary.duration_secs),
            "Mastery recomputation completed"
        );

        Ok(summary)
    }

    async fn recompute_user(&self, user_id: &str) -> Result<UserResult, StoreError> {
        let responses = self.store.responses_for_user(user_id)?;

        let mut grouped: BTreeMap<MasteryKey, usize> = BTreeMap::new();
        for response in &responses {
            *grouped.entry(response.key()).or_insert(0) += 1;
        }

        let mut result = UserResult::default();
        for key in grouped.into_keys() {
            match self.recompute_key(&key).await {
                Ok(mastery) => result.updated.push(mastery),
                Err(e) => {
                    result.keys_failed += 1;
                    error!(key = %key, error = %e, "Failed to recompute key");
                }
            }
        }
        Ok(result)
    }

    /// History is re-read under the lock so responses committed meanwhile are included
    async fn recompute_key(&self, key: &MasteryKey) -> Result<TopicMastery, StoreError> {
        let _guard = self.locks.lock(key).await;
        let history: Vec<Response> = self.store.responses_for_key(key)?;
        let mastery = self.engine.replay(key, &history);
        self.store.put_mastery(mastery.clone())?;
        Ok(mastery)
    }
}
