//! Engine error types
//!
//! Transport-tier failures raised at the executor seam, plus parse and
//! configuration errors. Probe and provisioning entry points never return
//! these directly; they fold them into `LoadBalancerStatus::error` or
//! `OperationResult::error`.

use std::time::Duration;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum LbError {
    /// The command channel cannot be reached at all
    #[error("Executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// Spawning the command-line tool failed
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but failed with nothing usable on stdout
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The command did not finish within the configured timeout
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Output could not be parsed into the expected resource
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for LbError {
    fn from(err: serde_json::Error) -> Self {
        LbError::Parse(err.to_string())
    }
}

/// Failures of the command channel itself
pub type ExecError = LbError;

/// Result type alias for engine operations
pub type LbResult<T> = std::result::Result<T, LbError>;
