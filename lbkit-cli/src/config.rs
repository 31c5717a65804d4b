//! CLI configuration management
//!
//! Engine settings come from the config file and environment; global
//! command-line flags are applied last.

use anyhow::{Context, Result};
use lbkit_engine::EngineConfig;
use std::path::PathBuf;

/// Global flags that override file and environment settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub context: Option<String>,
    pub kubeconfig: Option<PathBuf>,
}

impl CliOverrides {
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(context) = &self.context {
            config.kubectl.context = Some(context.clone());
        }
        if let Some(kubeconfig) = &self.kubeconfig {
            config.kubectl.kubeconfig = Some(kubeconfig.clone());
        }
    }
}

/// Load the engine configuration for this invocation
pub fn load(overrides: &CliOverrides) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(overrides.config.as_deref())
        .context("failed to load configuration")?;

    overrides.apply(&mut config);

    Ok(config)
}
