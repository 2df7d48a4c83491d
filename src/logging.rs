//! Tracing subscriber setup for host applications.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use termsnap_config::LoggingConfig;

use crate::error::ServiceError;

/// Keeps the file writer flushing for the life of the process.
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.level`. With `config.directory` set, logs
/// are also written there with daily rotation. Fails if a global subscriber
/// is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), ServiceError> {
    let env_filter = build_filter(&config.level)?;

    let console = if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    let file = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("termsnap")
                .filename_suffix("log")
                .max_log_files(14)
                .build(dir)
                .map_err(|e| ServiceError::Logging(e.to_string()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = GUARD.set(guard);
            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| ServiceError::Logging(e.to_string()))
}

/// `RUST_LOG` if set and valid, otherwise `level`.
fn build_filter(level: &str) -> Result<EnvFilter, ServiceError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| ServiceError::Logging(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter("debug,termsnap_store_sqlite=trace").is_ok());
    }

    #[test]
    fn test_init_writes_to_directory_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            json: false,
            directory: Some(dir.path().join("logs")),
        };

        init(&config).unwrap();
        assert!(dir.path().join("logs").is_dir());

        // A second global subscriber is refused.
        assert!(matches!(init(&config), Err(ServiceError::Logging(_))));
    }
}
