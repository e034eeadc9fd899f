use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::services::irt::IrtService;
use crate::services::locks::KeyLocks;
use crate::services::recompute::Recomputer;

static WORKER_LEADER: AtomicBool = AtomicBool::new(false);

pub fn is_worker_leader() -> bool {
    WORKER_LEADER.load(Ordering::Relaxed)
}

fn set_worker_leader(val: bool) {
    WORKER_LEADER.store(val, Ordering::Relaxed);
}

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    config: WorkerConfig,
    irt: Arc<IrtService>,
    recompute: Arc<Recomputer>,
    locks: Arc<KeyLocks>,
}

impl WorkerManager {
    pub async fn new(
        config: WorkerConfig,
        irt: Arc<IrtService>,
        recompute: Arc<Recomputer>,
        locks: Arc<KeyLocks>,
    ) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            config,
            irt,
            recompute,
            locks,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        if !self.config.leader {
            info!("WORKER_LEADER not set, skipping worker startup");
            return Ok(());
        }

        set_worker_leader(true);
        info!("Starting workers (leader mode)");

        let scheduler = self.scheduler.lock().await;

        if self.config.enable_irt {
            let schedule = self.config.irt_schedule.clone();
            let irt = Arc::clone(&self.irt);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(&schedule, move |_uuid, _lock| {
                let irt = Arc::clone(&irt);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        result = tokio::task::spawn_blocking(move || irt.recalibrate_all()) => {
                            match result {
                                Ok(Err(e)) => error!(error = %e, "IRT calibration worker error"),
                                Err(e) => error!(error = %e, "IRT calibration worker panicked"),
                                Ok(Ok(_)) => {}
                            }
                        }
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(schedule = %schedule, "IRT calibration worker scheduled");
        }

        if self.config.enable_recompute {
            let schedule = self.config.recompute_schedule.clone();
            let recompute = Arc::clone(&self.recompute);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(&schedule, move |_uuid, _lock| {
                let recompute = Arc::clone(&recompute);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        result = recompute.recompute_all(None) => {
                            if let Err(e) = result {
                                error!(error = %e, "Recompute worker error");
                            }
                        }
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(schedule = %schedule, "Recompute worker scheduled");
        }

        // idle key locks - every 10 minutes
        {
            let locks = Arc::clone(&self.locks);
            let job = Job::new_async("0 */10 * * * *", move |_uuid, _lock| {
                let locks = Arc::clone(&locks);
                Box::pin(async move {
                    let pruned = locks.prune();
                    if pruned > 0 {
                        info!(pruned = pruned, remaining = locks.len(), "Key lock cleanup");
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!("Key lock cleanup worker scheduled (every 10 minutes)");
        }

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        info!("All workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        if !is_worker_leader() {
            return;
        }

        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }

        set_worker_leader(false);
        info!("Workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
