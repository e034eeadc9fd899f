use std::sync::Arc;

use tracing::{debug, warn};

use mastery_algo::{
    trend, KeystoneScore, MasteryKey, MasteryUpdateEngine, ProgressionDecision,
    ProgressionEvaluator, ProgressionInput, TopicMastery,
};

use crate::graph::GraphError;
use crate::services::transfer::TransferService;
use crate::services::EngineError;
use crate::store::{optional, RecordStore};

pub struct ProgressionService {
    store: Arc<dyn RecordStore>,
    transfer: Arc<TransferService>,
    engine: MasteryUpdateEngine,
    evaluator: ProgressionEvaluator,
}

impl ProgressionService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        transfer: Arc<TransferService>,
        engine: MasteryUpdateEngine,
        evaluator: ProgressionEvaluator,
    ) -> Self {
        Self {
            store,
            transfer,
            engine,
            evaluator,
        }
    }

    /// Graph signals are dropped with a warning when the graph is down
    pub fn evaluate_progression(&self, key: &MasteryKey) -> Result<ProgressionDecision, EngineError> {
        let mastery = optional(self.store.get_mastery(key))?
            .unwrap_or_else(|| TopicMastery::new(key.clone()));
        let history = self.store.responses_for_key(key)?;
        let trajectory = self.engine.trajectory(key, &history);

        let transfer_boost = self.graph_signal(
            key,
            "transfer",
            self.transfer.aggregate_for(&key.user_id, &key.topic_id),
        )?;
        let keystone: Option<KeystoneScore> =
            self.graph_signal(key, "keystone", self.transfer.keystone_score(&key.topic_id))?;

        let input = ProgressionInput {
            current_level: key.bloom_level,
            mastery_score: mastery.mastery_score,
            questions_attempted: mastery.questions_attempted,
            trend: trend::analyze(&trajectory),
            transfer_boost,
            keystone,
        };

        let decision = self.evaluator.evaluate(&input);
        debug!(
            key = %key,
            action = ?decision.action,
            target_level = decision.target_level.get(),
            confidence = decision.confidence,
            "Progression evaluated"
        );
        Ok(decision)
    }

    /// Only graph failures degrade to a missing signal; anything else propagates
    fn graph_signal<T>(
        &self,
        key: &MasteryKey,
        signal: &str,
        result: Result<T, EngineError>,
    ) -> Result<Option<T>, EngineError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(EngineError::Graph(GraphError::TopicNotFound(_))) => Ok(None),
            Err(EngineError::Graph(e)) => {
                warn!(key = %key, signal = signal, error = %e, "Graph signal unavailable, evaluating without it");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
