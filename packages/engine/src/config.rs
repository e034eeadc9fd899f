use std::path::PathBuf;

use mastery_algo::IrtCalibrationParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingPolicy {
    /// Refuse responses older than the last folded one
    Reject,
    /// Re-sort the key's full history and replay it
    Replay,
}

impl OrderingPolicy {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "reject" => Self::Reject,
            _ => Self::Replay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "never" => Self::Never,
            _ => Self::Daily,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info,mastery_engine=debug`
    pub level: String,
    /// Directory for the rolling log file; stdout only when unset
    pub file_dir: Option<PathBuf>,
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_dir: None,
            rotation: LogRotation::Daily,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub leader: bool,
    pub enable_irt: bool,
    pub irt_schedule: String,
    pub enable_recompute: bool,
    pub recompute_schedule: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            leader: false,
            enable_irt: true,
            irt_schedule: "0 0 3 * * *".to_string(),
            enable_recompute: true,
            recompute_schedule: "0 30 4 * * 0".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub ordering_policy: OrderingPolicy,
    pub recompute_concurrency: usize,
    pub recompute_preview_limit: usize,
    pub irt: IrtCalibrationParams,
    pub seed_file: Option<PathBuf>,
    pub workers: WorkerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            ordering_policy: OrderingPolicy::Replay,
            recompute_concurrency: 4,
            recompute_preview_limit: 20,
            irt: IrtCalibrationParams::default(),
            seed_file: None,
            workers: WorkerConfig::default(),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

fn env_enabled(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse::<T>().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let logging = LoggingConfig {
            level: std::env::var("RUST_LOG").unwrap_or(defaults.logging.level),
            file_dir: env_flag("ENABLE_FILE_LOGS", false).then(|| {
                std::env::var("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./logs"))
            }),
            rotation: std::env::var("LOG_ROTATION")
                .map(|v| LogRotation::parse(&v))
                .unwrap_or(defaults.logging.rotation),
        };

        let ordering_policy = std::env::var("ORDERING_POLICY")
            .map(|v| OrderingPolicy::parse(&v))
            .unwrap_or(defaults.ordering_policy);

        let recompute_concurrency = env_parse::<usize>("RECOMPUTE_CONCURRENCY")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.recompute_concurrency);

        let recompute_preview_limit =
            env_parse::<usize>("RECOMPUTE_PREVIEW_LIMIT").unwrap_or(defaults.recompute_preview_limit);

        let irt = IrtCalibrationParams {
            min_samples: env_parse("IRT_MIN_SAMPLES").unwrap_or(defaults.irt.min_samples),
            min_unique_users: env_parse("IRT_MIN_USERS").unwrap_or(defaults.irt.min_unique_users),
        };

        let seed_file = std::env::var("SEED_FILE")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let workers = WorkerConfig {
            leader: env_flag("WORKER_LEADER", false),
            enable_irt: env_enabled("ENABLE_IRT_WORKER"),
            irt_schedule: std::env::var("IRT_SCHEDULE").unwrap_or(defaults.workers.irt_schedule),
            enable_recompute: env_enabled("ENABLE_RECOMPUTE_WORKER"),
            recompute_schedule: std::env::var("RECOMPUTE_SCHEDULE")
                .unwrap_or(defaults.workers.recompute_schedule),
        };

        Self {
            logging,
            ordering_policy,
            recompute_concurrency,
            recompute_preview_limit,
            irt,
            seed_file,
            workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_policy_parse() {
        assert_eq!(OrderingPolicy::parse("reject"), OrderingPolicy::Reject);
        assert_eq!(OrderingPolicy::parse("REJECT"), OrderingPolicy::Reject);
        assert_eq!(OrderingPolicy::parse("replay"), OrderingPolicy::Replay);
        assert_eq!(OrderingPolicy::parse("anything"), OrderingPolicy::Replay);
    }

    #[test]
    fn test_log_rotation_parse() {
        assert_eq!(LogRotation::parse("hourly"), LogRotation::Hourly);
        assert_eq!(LogRotation::parse("Never"), LogRotation::Never);
        assert_eq!(LogRotation::parse(""), LogRotation::Daily);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.recompute_preview_limit, 20);
        assert_eq!(config.irt.min_samples, 30);
        assert_eq!(config.irt.min_unique_users, 10);
        assert!(!config.workers.leader);
        assert!(config.logging.file_dir.is_none());
    }
}
