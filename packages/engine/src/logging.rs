use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogRotation, LoggingConfig};

const LOG_FILE_PREFIX: &str = "mastery-engine.log";

/// Flushes the background file writer on drop
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

fn file_writer(dir: &Path, config: &LoggingConfig) -> std::io::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    Ok(RollingFileAppender::new(rotation(config.rotation), dir, LOG_FILE_PREFIX))
}

/// Hold the returned guard until exit, otherwise buffered file lines are lost.
pub fn init_tracing(config: &LoggingConfig) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let appender = config.file_dir.as_deref().and_then(|dir| match file_writer(dir, config) {
        Ok(appender) => Some(appender),
        Err(err) => {
            eprintln!("log directory {} unusable, logging to stdout only: {err}", dir.display());
            None
        }
    });

    let Some(appender) = appender else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .init();
        return None;
    };

    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    Some(FileLogGuard { _guard: guard })
}
