//! LoadBalancer status detection
//!
//! Layered probe, cheapest first:
//!
//! ```text
//! namespace present ── services have IP ─────────────── configured (metallb)
//!        │          └─ controller ready / tolerated ─── configured (metallb)
//!        │          └─ controller partially ready ───── configured + advisory
//!        │          └─ controller missing / not ready ─ not configured (metallb)
//! namespace absent ─── services have IP ─────────────── configured (unknown | cloud)
//!                   └─ nothing ──────────────────────── not configured
//! ```
//!
//! A failed step never aborts the probe. It is logged, the next fallback
//! runs, and the first raw error is attached if nothing ends up configured.

use crate::config::{EngineConfig, MetalLbConfig};
use crate::error::{LbError, LbResult};
use crate::executor::{CommandExecutor, ExecResult, KubectlExecutor};
use crate::range;
use crate::resources::{self, IpAddressPool, ResourceList};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use lbkit_common::{ExternalService, LoadBalancerStatus, Provider};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Replica and pod counts gathered for one readiness decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadinessSample {
    pub ready_replicas: i32,
    pub desired_replicas: i32,
    pub running_tolerated_pods: usize,
}

/// Controller readiness verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Ready,
    /// Some but not all replicas are ready
    Partial,
    /// Deployment reports zero ready, but a controller pod is running
    Tolerated,
    NotReady,
}

impl ReadinessSample {
    pub(crate) fn assess(&self) -> Readiness {
        if self.ready_replicas <= 0 {
            if self.running_tolerated_pods > 0 {
                Readiness::Tolerated
            } else {
                Readiness::NotReady
            }
        } else if self.ready_replicas < self.desired_replicas {
            Readiness::Partial
        } else {
            Readiness::Ready
        }
    }
}

/// Result of the detailed controller probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerCheck {
    pub status: LoadBalancerStatus,
    /// The controller deployment exists, whatever its readiness
    pub deployment_found: bool,
}

impl ControllerCheck {
    fn missing(status: LoadBalancerStatus) -> Self {
        Self {
            status,
            deployment_found: false,
        }
    }
}

/// Whether quick namespace probe output names `namespace`
pub fn namespace_listed(result: &ExecResult, namespace: &str) -> bool {
    result
        .data_text()
        .is_some_and(|text| text.contains(namespace))
}

/// Read-only LoadBalancer status detection
pub struct StatusProbe<E: CommandExecutor = KubectlExecutor> {
    executor: Arc<E>,
    settings: MetalLbConfig,
}

impl<E: CommandExecutor> Clone for StatusProbe<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            settings: self.settings.clone(),
        }
    }
}

impl StatusProbe<KubectlExecutor> {
    /// Create a probe backed by kubectl
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Arc::new(KubectlExecutor::new(&config.kubectl)),
            config.metallb.clone(),
        )
    }
}

impl<E: CommandExecutor> StatusProbe<E> {
    /// Create a probe with a custom executor
    pub fn new(executor: Arc<E>, settings: MetalLbConfig) -> Self {
        Self { executor, settings }
    }

    pub fn settings(&self) -> &MetalLbConfig {
        &self.settings
    }

    pub(crate) fn executor(&self) -> &Arc<E> {
        &self.executor
    }

    /// Determine whether the cluster can hand out external addresses
    pub async fn check_status(&self) -> LoadBalancerStatus {
        let mut first_error: Option<String> = None;
        let mut record = |e: LbError| {
            warn!(error = %e, "Probe step failed");
            first_error.get_or_insert_with(|| e.to_string());
        };

        let namespace_present = self.namespace_present().await.unwrap_or_else(|e| {
            record(e);
            false
        });
        debug!(namespace = %self.settings.namespace, namespace_present, "Quick namespace probe");

        let services = self.services_with_external_ip().await.unwrap_or_else(|e| {
            record(e);
            Vec::new()
        });

        let status = if namespace_present {
            if !services.is_empty() {
                info!(count = services.len(), "LoadBalancer services have external addresses");
                LoadBalancerStatus::configured(Provider::Metallb).with_services(services)
            } else {
                self.check_controller().await.status
            }
        } else if !services.is_empty() {
            let provider = if self.nodes_indicate_cloud().await {
                Provider::Cloud
            } else {
                Provider::Unknown
            };
            info!(%provider, count = services.len(), "External addresses assigned without MetalLB");
            LoadBalancerStatus::configured(provider).with_services(services)
        } else {
            LoadBalancerStatus::not_configured()
        };

        match first_error {
            Some(error) if !status.is_configured && status.error.is_none() => status.with_error(error),
            _ => status,
        }
    }

    /// Quick presence check for the controller namespace
    pub async fn namespace_present(&self) -> LbResult<bool> {
        let ns = self.settings.namespace.as_str();
        let result = self
            .run(&["get", "namespace", ns, "--ignore-not-found", "-o", "name"])
            .await?;
        Ok(namespace_listed(&result, ns))
    }

    /// LoadBalancer Services across all namespaces that hold an external address
    pub async fn services_with_external_ip(&self) -> LbResult<Vec<ExternalService>> {
        let result = self
            .run(&[
                "get",
                "services",
                "--all-namespaces",
                "--field-selector",
                "spec.type=LoadBalancer",
                "-o",
                "json",
            ])
            .await?;

        let services = self
            .parse_or_absent::<ResourceList<Service>>("services", &result)
            .map(|list| list.items)
            .unwrap_or_default();

        Ok(resources::external_services(&services))
    }

    /// Detailed controller probe: namespace, deployment, pods, pools
    pub async fn check_controller(&self) -> ControllerCheck {
        let ns = self.settings.namespace.as_str();

        let namespace = match self
            .run(&["get", "namespace", ns, "--ignore-not-found", "-o", "json"])
            .await
        {
            Ok(result) => self.parse_or_absent::<Namespace>("namespace", &result),
            Err(e) => {
                warn!(error = %e, "Namespace lookup failed");
                return ControllerCheck::missing(
                    LoadBalancerStatus::not_configured().with_error(e.to_string()),
                );
            }
        };
        if namespace.is_none() {
            return ControllerCheck::missing(LoadBalancerStatus::not_configured());
        }

        let deployment = match self
            .run(&[
                "get",
                "deployment",
                &self.settings.controller_deployment,
                "-n",
                ns,
                "--ignore-not-found",
                "-o",
                "json",
            ])
            .await
        {
            Ok(result) => self.parse_or_absent::<Deployment>("controller deployment", &result),
            Err(e) => {
                warn!(error = %e, "Controller deployment lookup failed");
                return ControllerCheck::missing(LoadBalancerStatus::failed(
                    Provider::Metallb,
                    e.to_string(),
                ));
            }
        };
        let Some(deployment) = deployment else {
            return ControllerCheck::missing(LoadBalancerStatus::failed(
                Provider::Metallb,
                "controller deployment not found",
            ));
        };

        let (ready, desired) = resources::replica_counts(&deployment);
        let mut sample = ReadinessSample {
            ready_replicas: ready,
            desired_replicas: desired,
            running_tolerated_pods: 0,
        };
        let mut pod_lookup_error = None;
        if ready <= 0 {
            match self.tolerated_controller_pods().await {
                Ok(count) => sample.running_tolerated_pods = count,
                Err(e) => {
                    warn!(error = %e, "Controller pod lookup failed");
                    pod_lookup_error = Some(e.to_string());
                }
            }
        }

        let advisory = match sample.assess() {
            Readiness::Ready => None,
            Readiness::Tolerated => {
                info!(
                    pods = sample.running_tolerated_pods,
                    desired, "Deployment reports no ready replicas but controller pods are running"
                );
                None
            }
            Readiness::Partial => {
                let message =
                    format!("controller partially ready: {}/{} replicas running", ready, desired);
                warn!("{}", message);
                Some(message)
            }
            Readiness::NotReady => {
                let mut message =
                    format!("controller not ready: {}/{} replicas running", ready, desired);
                if let Some(cause) = pod_lookup_error {
                    message.push_str(&format!(" (pod lookup failed: {})", cause));
                }
                return ControllerCheck {
                    status: LoadBalancerStatus::failed(Provider::Metallb, message),
                    deployment_found: true,
                };
            }
        };

        let ip_pools = self.ip_pools().await;
        let version = resources::deployment_version(&deployment);
        info!(%version, pools = ip_pools.len(), "MetalLB controller is ready");

        ControllerCheck {
            status: LoadBalancerStatus {
                is_configured: true,
                provider: Provider::Metallb,
                version: Some(version),
                ip_pools,
                services: Vec::new(),
                error: advisory,
            },
            deployment_found: true,
        }
    }

    /// Running controller pods that pass the readiness tolerance
    async fn tolerated_controller_pods(&self) -> LbResult<usize> {
        let result = self
            .run(&[
                "get",
                "pods",
                "-n",
                &self.settings.namespace,
                "-l",
                &self.settings.controller_selector,
                "-o",
                "json",
            ])
            .await?;

        Ok(self
            .parse_or_absent::<ResourceList<Pod>>("controller pods", &result)
            .map(|list| list.items.iter().filter(|p| resources::is_tolerated_ready(p)).count())
            .unwrap_or(0))
    }

    async fn ip_pools(&self) -> Vec<lbkit_common::IpPool> {
        let result = match self
            .run(&[
                "get",
                "ipaddresspools.metallb.io",
                "-n",
                &self.settings.namespace,
                "--ignore-not-found",
                "-o",
                "json",
            ])
            .await
        {
            Ok(result) => result,
            Err(e) => {
                debug!(error = %e, "IPAddressPool lookup failed");
                return Vec::new();
            }
        };

        self.parse_or_absent::<ResourceList<IpAddressPool>>("ip address pools", &result)
            .map(|list| resources::ip_pools(list.items))
            .unwrap_or_default()
    }

    async fn nodes_indicate_cloud(&self) -> bool {
        match range::list_nodes(self.executor.as_ref()).await {
            Ok(nodes) => nodes.iter().any(resources::node_indicates_cloud),
            Err(e) => {
                debug!(error = %e, "Node lookup for provider classification failed");
                false
            }
        }
    }

    /// Execute and reject results with nothing usable
    async fn run(&self, args: &[&str]) -> LbResult<ExecResult> {
        let result = self.executor.exec(args).await?;
        if result.is_hard_failure() {
            return Err(LbError::CommandFailed(result.failure_message()));
        }
        Ok(result)
    }

    fn parse_or_absent<T: DeserializeOwned>(&self, what: &str, result: &ExecResult) -> Option<T> {
        match resources::parse_output::<T>(result) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(resource = what, error = %e, "Unparseable output treated as absent");
                None
            }
        }
    }
}
