use std::sync::Arc;

use mastery_engine::config::Config;
use mastery_engine::graph::MemoryGraph;
use mastery_engine::logging;
use mastery_engine::seed;
use mastery_engine::state::AppState;
use mastery_engine::store::MemoryStore;
use mastery_engine::workers::WorkerManager;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.logging);

    let store = Arc::new(MemoryStore::new());
    let graph = Arc::new(MemoryGraph::default());

    if let Some(path) = config.seed_file.clone() {
        match seed::load_seed(&path).await {
            Ok(data) => {
                if let Err(e) = seed::apply_seed(data, store.as_ref(), graph.as_ref()) {
                    tracing::error!(path = %path.display(), error = %e, "failed to apply seed data");
                }
            }
            Err(e) => tracing::error!(path = %path.display(), error = %e, "failed to load seed file"),
        }
    }

    let state = AppState::new(config.clone(), store, graph);

    match state.recompute.recompute_all(None).await {
        Ok(summary) => tracing::info!(
            records_updated = summary.records_updated,
            users_processed = summary.users_processed,
            "startup recomputation finished"
        ),
        Err(e) => tracing::error!(error = %e, "startup recomputation failed"),
    }

    let irt = Arc::clone(&state.irt);
    match tokio::task::spawn_blocking(move || irt.recalibrate_all()).await {
        Ok(Ok(summary)) => tracing::info!(
            calibrated = summary.calibrated,
            insufficient = summary.insufficient,
            "startup IRT calibration finished"
        ),
        Ok(Err(e)) => tracing::error!(error = %e, "startup IRT calibration failed"),
        Err(e) => tracing::error!(error = %e, "startup IRT calibration panicked"),
    }

    let worker_manager = match WorkerManager::new(
        config.workers.clone(),
        Arc::clone(&state.irt),
        Arc::clone(&state.recompute),
        Arc::clone(&state.locks),
    )
    .await
    {
        Ok(manager) => {
            if let Err(e) = manager.start().await {
                tracing::error!(error = %e, "failed to start workers");
            }
            Some(manager)
        }
        Err(e) => {
            tracing::warn!(error = %e, "worker manager not initialized");
            None
        }
    };

    tracing::info!("mastery-engine running");
    shutdown_signal().await;
    tracing::info!("shutdown signal received, initiating graceful shutdown sequence");

    if let Some(ref manager) = worker_manager {
        manager.stop().await;
    }

    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
