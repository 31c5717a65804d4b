//! MetalLB install, configure and remove
//!
//! `configure` runs strictly in order and stops at the first genuine
//! failure: install (unless already present), bounded readiness wait,
//! range resolution, IPAddressPool, L2Advertisement. Every apply is
//! classified by [`classify`] so re-running against a converged cluster
//! succeeds. There is no lock around the sequence; overlapping calls race
//! on the same objects and rely on that idempotency to converge.
//!
//! Convergence is confirmed by the caller re-running
//! [`StatusProbe::check_status`] after a short delay.

use super::classify::{classify, ApplyOutcome};
use super::manifests;
use super::probe::StatusProbe;
use crate::config::{EngineConfig, MetalLbConfig};
use crate::error::LbError;
use crate::executor::{CommandExecutor, KubectlExecutor};
use crate::range::{self, NetworkRangeDetector};
use lbkit_common::{IpRange, LoadBalancerConfiguration, OperationResult};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Provisioning failures
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("unable to determine IP range")]
    RangeUndetermined,

    #[error("invalid IP range: {0}")]
    InvalidRange(String),

    #[error("failed to install MetalLB: {0}")]
    Install(String),

    #[error("failed to create IP address pool: {0}")]
    Pool(String),

    #[error("failed to create L2 advertisement: {0}")]
    Advertisement(String),

    #[error(transparent)]
    Engine(#[from] LbError),
}

/// Mutating half of the engine
pub struct ProvisioningWorkflow<E: CommandExecutor = KubectlExecutor> {
    probe: StatusProbe<E>,
}

impl ProvisioningWorkflow<KubectlExecutor> {
    /// Create a workflow backed by kubectl
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            probe: StatusProbe::from_config(config),
        }
    }
}

impl<E: CommandExecutor> ProvisioningWorkflow<E> {
    /// Create a workflow with a custom executor
    pub fn new(executor: Arc<E>, settings: MetalLbConfig) -> Self {
        Self {
            probe: StatusProbe::new(executor, settings),
        }
    }

    /// The probe sharing this workflow's executor
    pub fn probe(&self) -> &StatusProbe<E> {
        &self.probe
    }

    fn settings(&self) -> &MetalLbConfig {
        self.probe.settings()
    }

    fn executor(&self) -> &E {
        self.probe.executor().as_ref()
    }

    /// Install MetalLB if needed and point it at an address range
    pub async fn configure(&self, config: &LoadBalancerConfiguration) -> OperationResult {
        match self.run_configure(config).await {
            Ok(range) => {
                info!(%range, "MetalLB configuration steps completed");
                OperationResult::ok()
            }
            Err(e) => {
                error!(error = %e, "MetalLB configuration failed");
                OperationResult::failed(e.to_string())
            }
        }
    }

    /// Delete everything the upstream manifest created
    ///
    /// No idempotency tolerance: any failure reported by the tool is returned
    /// as-is.
    pub async fn remove(&self) -> OperationResult {
        let url = self.settings().manifest_url.as_str();
        info!(manifest = url, "Removing MetalLB");

        match self
            .executor()
            .exec(&["delete", "--ignore-not-found=true", "-f", url])
            .await
        {
            Ok(result) if result.success => OperationResult::ok(),
            Ok(result) => {
                let message = result
                    .error
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .or_else(|| result.data.clone())
                    .unwrap_or_else(|| "delete failed without output".to_string());
                error!(error = %message, "MetalLB removal failed");
                OperationResult::failed(message)
            }
            Err(e) => {
                error!(error = %e, "MetalLB removal failed");
                OperationResult::failed(e.to_string())
            }
        }
    }

    async fn run_configure(&self, config: &LoadBalancerConfiguration) -> Result<String, ProvisionError> {
        // explicit ranges are checked before anything touches the cluster
        let explicit_range = if config.auto_detect_range {
            None
        } else {
            Some(parse_explicit_range(&config.ip_range)?)
        };

        let check = self.probe.check_controller().await;
        if check.deployment_found {
            crate::log_step!("install", "skipped", reason = "controller deployment present");
        } else {
            let outcome = self.install().await?;
            crate::log_step!("install", outcome);
        }

        self.wait_for_controller().await;

        let resolved = match explicit_range {
            Some(range) => range,
            None => self.detect_range().await?,
        };
        let range = resolved.to_string();
        crate::log_step!(
            "resolve-range",
            "resolved",
            range = range.as_str(),
            addresses = resolved.address_count()
        );

        let settings = self.settings();
        let pool = manifests::ip_address_pool(&settings.pool_name, &settings.namespace, &range)?;
        let outcome = self
            .apply(&pool)
            .await
            .map_err(ProvisionError::Pool)?;
        crate::log_step!("ip-address-pool", outcome, pool = settings.pool_name.as_str());

        let advertisement = manifests::l2_advertisement(
            &settings.l2_advertisement_name,
            &settings.namespace,
            &settings.pool_name,
        )?;
        let outcome = self
            .apply(&advertisement)
            .await
            .map_err(ProvisionError::Advertisement)?;
        crate::log_step!(
            "l2-advertisement",
            outcome,
            advertisement = settings.l2_advertisement_name.as_str()
        );

        Ok(range)
    }

    async fn install(&self) -> Result<ApplyOutcome, ProvisionError> {
        let url = self.settings().manifest_url.as_str();
        info!(manifest = url, "Installing MetalLB");

        let result = self
            .executor()
            .exec(&["apply", "--validate=false", "-f", url])
            .await
            .map_err(|e| ProvisionError::Install(e.to_string()))?;

        match classify(&result, false) {
            ApplyOutcome::Failed(raw) => Err(ProvisionError::Install(raw)),
            outcome => Ok(outcome),
        }
    }

    /// Bounded wait on controller pods; never fails the workflow
    async fn wait_for_controller(&self) {
        let settings = self.settings();
        let selector = format!("--selector={}", settings.controller_selector);
        let timeout = format!("--timeout={}s", settings.wait_timeout().as_secs());

        let result = self
            .executor()
            .exec(&[
                "wait",
                "--namespace",
                &settings.namespace,
                "--for=condition=ready",
                "pod",
                &selector,
                &timeout,
            ])
            .await;

        match result {
            Ok(result) if result.success => {
                crate::log_step!("wait", "ready");
            }
            Ok(result) => {
                warn!(
                    error = %result.failure_message(),
                    "MetalLB pods not confirmed ready, continuing with configuration"
                );
            }
            Err(e) => {
                warn!(error = %e, "Readiness wait failed, continuing with configuration");
            }
        }
    }

    async fn detect_range(&self) -> Result<IpRange, ProvisionError> {
        let node_ip = range::first_node_internal_ip(self.executor())
            .await
            .ok_or(ProvisionError::RangeUndetermined)?;

        let detected = NetworkRangeDetector::detect(&node_ip).ok_or_else(|| {
            warn!(%node_ip, "No address range heuristic matches the node IP");
            ProvisionError::RangeUndetermined
        })?;
        detected
            .parse::<IpRange>()
            .map_err(|e| ProvisionError::InvalidRange(e.to_string()))
    }

    /// Apply a generated manifest, tolerating "already exists"
    async fn apply(&self, manifest: &str) -> Result<ApplyOutcome, String> {
        let result = self
            .executor()
            .apply_manifest(manifest)
            .await
            .map_err(|e| e.to_string())?;

        match classify(&result, true) {
            ApplyOutcome::Failed(raw) => Err(raw),
            outcome => Ok(outcome),
        }
    }
}

fn parse_explicit_range(raw: &str) -> Result<IpRange, ProvisionError> {
    if raw.trim().is_empty() {
        return Err(ProvisionError::RangeUndetermined);
    }
    raw.parse::<IpRange>()
        .map_err(|e| ProvisionError::InvalidRange(e.to_string()))
}
