//! Command execution seam
//!
//! Everything the engine learns about the cluster comes through
//! [`CommandExecutor`]. Its results are weakly typed: `success` is a hint,
//! not a verdict, and `data` may be empty, plain text, or JSON.

use crate::config::KubectlConfig;
use crate::error::{ExecError, LbError};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Raw outcome of one command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub success: bool,
    pub data: Option<String>,
    pub error: Option<String>,
}

impl ExecResult {
    pub fn ok(data: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Trimmed stdout, `None` when empty or the literal `null`
    pub fn data_text(&self) -> Option<&str> {
        self.data
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "null")
    }

    /// Trimmed stderr, `None` when empty
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// stdout and stderr joined, for free-text classification
    pub fn combined_output(&self) -> String {
        let mut out = String::new();
        if let Some(data) = self.data.as_deref() {
            out.push_str(data);
        }
        if let Some(error) = self.error.as_deref() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(error);
        }
        out
    }

    /// Failed with nothing usable on stdout
    pub fn is_hard_failure(&self) -> bool {
        !self.success && self.data_text().is_none()
    }

    /// Best single-line description of a failure
    pub fn failure_message(&self) -> String {
        self.error_text()
            .or_else(|| self.data_text())
            .unwrap_or("command failed without output")
            .to_string()
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Self {
            success: output.status.success(),
            data: Some(stdout).filter(|s| !s.is_empty()),
            error: Some(stderr).filter(|s| !s.is_empty()),
        }
    }
}

/// Trait for executing cluster-management commands (allows mocking in tests)
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the cluster CLI with `args`
    async fn exec(&self, args: &[&str]) -> Result<ExecResult, ExecError>;

    /// Apply a declarative manifest
    async fn apply_manifest(&self, manifest: &str) -> Result<ExecResult, ExecError>;
}

/// Executor that shells out to `kubectl`
#[derive(Debug, Clone)]
pub struct KubectlExecutor {
    binary: String,
    context: Option<String>,
    kubeconfig: Option<std::path::PathBuf>,
    timeout: Duration,
}

impl Default for KubectlExecutor {
    fn default() -> Self {
        Self::new(&KubectlConfig::default())
    }
}

impl KubectlExecutor {
    pub fn new(config: &KubectlConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            context: config.context.clone(),
            kubeconfig: config.kubeconfig.clone(),
            timeout: config.timeout(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(ref kubeconfig) = self.kubeconfig {
            cmd.arg("--kubeconfig").arg(kubeconfig);
        }
        if let Some(ref context) = self.context {
            cmd.arg("--context").arg(context);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> LbError {
        if source.kind() == std::io::ErrorKind::NotFound {
            return LbError::ExecutorUnavailable(format!("{} not found in PATH", self.binary));
        }
        LbError::Spawn {
            program: self.binary.clone(),
            source,
        }
    }
}

#[async_trait]
impl CommandExecutor for KubectlExecutor {
    async fn exec(&self, args: &[&str]) -> Result<ExecResult, ExecError> {
        let mut cmd = self.command(args);
        debug!(binary = %self.binary, ?args, "Executing command");

        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| LbError::Timeout(self.timeout))?
            .map_err(|e| self.spawn_error(e))?;

        let result = ExecResult::from(output);
        debug!(success = result.success, "Command finished");
        Ok(result)
    }

    async fn apply_manifest(&self, manifest: &str) -> Result<ExecResult, ExecError> {
        let mut cmd = self.command(&["apply", "-f", "-"]);
        cmd.stdin(Stdio::piped());
        debug!(binary = %self.binary, "Applying manifest via stdin");

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdin = child.stdin.take();

        // stdin write and wait share one deadline
        let output = tokio::time::timeout(self.timeout, async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(manifest.as_bytes()).await?;
                // close stdin so kubectl sees EOF
                drop(stdin);
            }
            child.wait_with_output().await
        })
        .await
        .map_err(|_| LbError::Timeout(self.timeout))?
        .map_err(|e| self.spawn_error(e))?;

        let result = ExecResult::from(output);
        debug!(success = result.success, "Manifest apply finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_text_filters_null_and_blank() {
        assert_eq!(ExecResult::ok("  \n").data_text(), None);
        assert_eq!(ExecResult::ok("null\n").data_text(), None);
        assert_eq!(
            ExecResult::ok("namespace/metallb-system\n").data_text(),
            Some("namespace/metallb-system")
        );
    }

    #[test]
    fn test_combined_output_joins_streams() {
        let result = ExecResult {
            success: false,
            data: Some("ipaddresspool.metallb.io/docker-desktop-pool unchanged".to_string()),
            error: Some("Warning: something".to_string()),
        };
        let text = result.combined_output();
        assert!(text.contains("unchanged"));
        assert!(text.contains("Warning"));
    }

    #[test]
    fn test_failure_message_prefers_stderr() {
        let result = ExecResult {
            success: false,
            data: Some("partial".to_string()),
            error: Some("Error from server (Forbidden)".to_string()),
        };
        assert_eq!(result.failure_message(), "Error from server (Forbidden)");
        assert!(!result.is_hard_failure());

        let empty = ExecResult {
            success: false,
            data: None,
            error: None,
        };
        assert_eq!(empty.failure_message(), "command failed without output");
        assert!(empty.is_hard_failure());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apply_times_out_when_stdin_is_never_read() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("stalled-kubectl");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let executor = KubectlExecutor::new(&KubectlConfig {
            binary: script.display().to_string(),
            timeout_secs: 1,
            ..Default::default()
        });

        // larger than any pipe buffer, so the write blocks on the idle reader
        let manifest = "#".repeat(4 * 1024 * 1024);
        let started = std::time::Instant::now();
        let err = executor.apply_manifest(&manifest).await.unwrap_err();

        assert!(matches!(err, LbError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let executor = KubectlExecutor::new(&KubectlConfig {
            binary: "lbkit-definitely-not-a-real-binary".to_string(),
            ..Default::default()
        });

        let err = executor.exec(&["version"]).await.unwrap_err();
        assert!(matches!(err, LbError::ExecutorUnavailable(_)));
    }
}
