//! Logging configuration module
//!
//! Structured logging to stderr with an optional rolling JSON log file.

use crate::config::LoggingSettings;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    pub json_format: bool,
}

/// Log rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file_path: None,
            rotation: LogRotation::Daily,
            json_format: false,
        }
    }
}

impl From<&LoggingSettings> for LoggingConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            file_path: settings.file_path.clone(),
            rotation: settings.rotation,
            json_format: settings.json_format,
        }
    }
}

impl LoggingConfig {
    /// Initialize logging based on configuration
    ///
    /// The returned guard flushes the file writer on drop and must be held
    /// for the life of the process.
    pub fn init(&self) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
        // RUST_LOG wins over the configured level
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        // stdout is reserved for command output
        if self.json_format {
            layers.push(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(io::stderr)
                    .boxed(),
            );
        } else {
            layers.push(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_writer(io::stderr)
                    .boxed(),
            );
        }

        let mut guard = None;
        if let Some(ref path) = self.file_path {
            let file_appender = match self.rotation {
                LogRotation::Hourly => rolling::hourly(path, "lbkit.log"),
                LogRotation::Daily => rolling::daily(path, "lbkit.log"),
                LogRotation::Never => rolling::never(path, "lbkit.log"),
            };

            let (writer, file_guard) = non_blocking(file_appender);
            guard = Some(file_guard);

            layers.push(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(false)
                    .json()
                    .with_writer(writer)
                    .boxed(),
            );
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()?;

        tracing::debug!(level = %self.level, file = ?self.file_path, "Logging initialized");

        Ok(guard)
    }
}

/// Log a provisioning step with its outcome
#[macro_export]
macro_rules! log_step {
    ($step:expr, $outcome:expr) => {
        tracing::info!(step = $step, outcome = %$outcome, "Provisioning step")
    };
    ($step:expr, $outcome:expr, $($key:ident = $value:expr),+) => {
        tracing::info!(step = $step, outcome = %$outcome, $($key = $value),+, "Provisioning step")
    };
}
