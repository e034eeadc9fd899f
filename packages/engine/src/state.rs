use std::sync::Arc;

use mastery_algo::{
    IntervalTable, IrtCalibrator, MasteryUpdateEngine, ProgressionEvaluator,
};

use crate::config::Config;
use crate::graph::GraphService;
use crate::services::calibration::CalibrationService;
use crate::services::irt::IrtService;
use crate::services::locks::KeyLocks;
use crate::services::progression::ProgressionService;
use crate::services::recompute::Recomputer;
use crate::services::responses::ResponseProcessor;
use crate::services::transfer::TransferService;
use crate::store::RecordStore;

/// Shared handles to every service. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub graph: Arc<dyn GraphService>,
    pub locks: Arc<KeyLocks>,
    pub responses: Arc<ResponseProcessor>,
    pub recompute: Arc<Recomputer>,
    pub irt: Arc<IrtService>,
    pub calibration: Arc<CalibrationService>,
    pub transfer: Arc<TransferService>,
    pub progression: Arc<ProgressionService>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>, graph: Arc<dyn GraphService>) -> Self {
        Self::with_table(config, store, graph, IntervalTable::default())
    }

    pub fn with_table(
        config: Config,
        store: Arc<dyn RecordStore>,
        graph: Arc<dyn GraphService>,
        table: IntervalTable,
    ) -> Self {
        let locks = Arc::new(KeyLocks::new());
        let engine = MasteryUpdateEngine::default();

        let responses = Arc::new(ResponseProcessor::new(
            Arc::clone(&store),
            Arc::clone(&locks),
            engine.clone(),
            Arc::new(table),
            config.ordering_policy,
        ));
        let recompute = Arc::new(Recomputer::new(
            Arc::clone(&store),
            Arc::clone(&locks),
            engine.clone(),
            config.recompute_concurrency,
            config.recompute_preview_limit,
        ));
        let irt = Arc::new(IrtService::new(
            Arc::clone(&store),
            IrtCalibrator::new(config.irt.clone()),
        ));
        let calibration = Arc::new(CalibrationService::new(Arc::clone(&store)));
        let transfer = Arc::new(TransferService::new(Arc::clone(&store), Arc::clone(&graph)));
        let progression = Arc::new(ProgressionService::new(
            Arc::clone(&store),
            Arc::clone(&transfer),
            engine,
            ProgressionEvaluator::default(),
        ));

        Self {
            config: Arc::new(config),
            store,
            graph,
            locks,
            responses,
            recompute,
            irt,
            calibration,
            transfer,
            progression,
        }
    }
}
