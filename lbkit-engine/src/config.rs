//! Configuration management for lbkit
//!
//! Settings are resolved from:
//! 1. Environment variables (highest priority)
//! 2. Configuration file (TOML format)
//! 3. Default values (lowest priority)
//!
//! Command-line flags are applied on top by the caller.

use crate::error::{LbError, LbResult};
use crate::logging::LogRotation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upstream MetalLB native manifest installed by `configure`
pub const DEFAULT_METALLB_MANIFEST: &str =
    "https://raw.githubusercontent.com/metallb/metallb/v0.14.8/config/manifests/metallb-native.yaml";

/// Main configuration struct for the engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// How the cluster CLI is invoked
    pub kubectl: KubectlConfig,
    /// Where and how MetalLB is installed
    pub metallb: MetalLbConfig,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Cluster CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubectlConfig {
    /// Binary name or path
    pub binary: String,
    /// kubeconfig context to pass as `--context`
    pub context: Option<String>,
    /// kubeconfig file to pass as `--kubeconfig`
    pub kubeconfig: Option<PathBuf>,
    /// Upper bound for any single invocation
    pub timeout_secs: u64,
}

/// MetalLB installation layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetalLbConfig {
    pub namespace: String,
    pub controller_deployment: String,
    /// Label selector matching controller pods
    pub controller_selector: String,
    pub manifest_url: String,
    pub pool_name: String,
    pub l2_advertisement_name: String,
    /// Bounded readiness wait after install
    pub wait_timeout_secs: u64,
}

/// Logging settings as they appear in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for rolling log files; console only when unset
    pub file_path: Option<PathBuf>,
    /// How often the log file rolls over
    pub rotation: LogRotation,
    /// Use JSON formatting on the console
    pub json_format: bool,
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            binary: "kubectl".to_string(),
            context: None,
            kubeconfig: None,
            timeout_secs: 120,
        }
    }
}

impl Default for MetalLbConfig {
    fn default() -> Self {
        Self {
            namespace: "metallb-system".to_string(),
            controller_deployment: "controller".to_string(),
            controller_selector: "app=metallb,component=controller".to_string(),
            manifest_url: DEFAULT_METALLB_MANIFEST.to_string(),
            pool_name: "docker-desktop-pool".to_string(),
            l2_advertisement_name: "docker-desktop-l2".to_string(),
            wait_timeout_secs: 90,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file_path: None,
            rotation: LogRotation::Daily,
            json_format: false,
        }
    }
}

impl KubectlConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MetalLbConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

impl EngineConfig {
    /// Load configuration from environment variables and optional config file
    ///
    /// `path` replaces the search of the standard locations when given.
    pub fn load(path: Option<&Path>) -> LbResult<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::find_config_file) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> LbResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LbError::Config(format!("failed to read {}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| LbError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            std::env::var("LBKIT_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("/etc/lbkit/config.toml")),
            Some(PathBuf::from("./lbkit.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(binary) = std::env::var("LBKIT_KUBECTL") {
            self.kubectl.binary = binary;
        }
        if let Ok(context) = std::env::var("LBKIT_CONTEXT") {
            self.kubectl.context = Some(context);
        }
        if let Ok(path) = std::env::var("KUBECONFIG") {
            // kubectl accepts a path list here; only a single file is forwarded explicitly
            if !path.contains(':') {
                self.kubectl.kubeconfig = Some(PathBuf::from(path));
            }
        }
        if let Ok(url) = std::env::var("LBKIT_METALLB_MANIFEST") {
            self.metallb.manifest_url = url;
        }
        if let Ok(secs) = std::env::var("LBKIT_WAIT_TIMEOUT") {
            if let Ok(secs) = secs.parse() {
                self.metallb.wait_timeout_secs = secs;
            }
        }
        if let Ok(level) = std::env::var("LBKIT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(path) = std::env::var("LBKIT_LOG_DIR") {
            self.logging.file_path = Some(PathBuf::from(path));
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> LbResult<()> {
        if self.kubectl.binary.trim().is_empty() {
            return Err(LbError::Config("kubectl binary cannot be empty".to_string()));
        }

        if self.kubectl.timeout_secs == 0 {
            return Err(LbError::Config("kubectl timeout cannot be 0".to_string()));
        }

        if self.metallb.wait_timeout_secs == 0 {
            return Err(LbError::Config("readiness wait timeout cannot be 0".to_string()));
        }

        // The readiness wait runs inside a single kubectl call
        if self.kubectl.timeout_secs <= self.metallb.wait_timeout_secs {
            return Err(LbError::Config(format!(
                "kubectl timeout ({}s) must exceed the readiness wait ({}s)",
                self.kubectl.timeout_secs, self.metallb.wait_timeout_secs
            )));
        }

        if self.metallb.namespace.is_empty() || self.metallb.pool_name.is_empty() {
            return Err(LbError::Config(
                "metallb namespace and pool name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
