//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use lbkit_engine::config::MetalLbConfig;
use lbkit_engine::{CommandExecutor, ExecResult, LbError, ProvisioningWorkflow, StatusProbe};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// One recorded executor invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exec(String),
    Apply(String),
}

#[derive(Debug, Clone)]
enum Response {
    Result(ExecResult),
    Unavailable(String),
}

impl Response {
    fn produce(&self) -> Result<ExecResult, LbError> {
        match self {
            Response::Result(result) => Ok(result.clone()),
            Response::Unavailable(msg) => Err(LbError::ExecutorUnavailable(msg.clone())),
        }
    }
}

/// Scripted executor
///
/// `exec` rules match on the space-joined argument list by prefix, `apply`
/// rules on a substring of the manifest. First match wins; unmatched calls
/// succeed with empty output, which reads as "not found".
#[derive(Default)]
pub struct MockExecutor {
    exec_rules: Vec<(String, Response)>,
    apply_rules: Vec<(String, Response)>,
    fallback: Option<Response>,
    calls: Mutex<Vec<Call>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_exec(mut self, prefix: &str, result: ExecResult) -> Self {
        self.exec_rules.push((prefix.to_string(), Response::Result(result)));
        self
    }

    pub fn on_exec_unavailable(mut self, prefix: &str, msg: &str) -> Self {
        self.exec_rules
            .push((prefix.to_string(), Response::Unavailable(msg.to_string())));
        self
    }

    pub fn on_apply(mut self, needle: &str, result: ExecResult) -> Self {
        self.apply_rules.push((needle.to_string(), Response::Result(result)));
        self
    }

    /// Every unmatched call fails at the transport level
    pub fn unreachable(mut self, msg: &str) -> Self {
        self.fallback = Some(Response::Unavailable(msg.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn exec_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Exec(args) => Some(args),
                Call::Apply(_) => None,
            })
            .collect()
    }

    pub fn applied_manifests(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Apply(manifest) => Some(manifest),
                Call::Exec(_) => None,
            })
            .collect()
    }

    fn unmatched(&self) -> Result<ExecResult, LbError> {
        match &self.fallback {
            Some(response) => response.produce(),
            None => Ok(ExecResult {
                success: true,
                data: None,
                error: None,
            }),
        }
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn exec(&self, args: &[&str]) -> Result<ExecResult, LbError> {
        let joined = args.join(" ");
        self.calls.lock().unwrap().push(Call::Exec(joined.clone()));

        match self.exec_rules.iter().find(|(prefix, _)| joined.starts_with(prefix.as_str())) {
            Some((_, response)) => response.produce(),
            None => self.unmatched(),
        }
    }

    async fn apply_manifest(&self, manifest: &str) -> Result<ExecResult, LbError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Apply(manifest.to_string()));

        match self.apply_rules.iter().find(|(needle, _)| manifest.contains(needle.as_str())) {
            Some((_, response)) => response.produce(),
            None => self.unmatched(),
        }
    }
}

pub fn probe(mock: &Arc<MockExecutor>) -> StatusProbe<MockExecutor> {
    StatusProbe::new(Arc::clone(mock), MetalLbConfig::default())
}

pub fn workflow(mock: &Arc<MockExecutor>) -> ProvisioningWorkflow<MockExecutor> {
    ProvisioningWorkflow::new(Arc::clone(mock), MetalLbConfig::default())
}

// ============== Command prefixes ==============

pub const NS_QUICK: &str = "get namespace metallb-system --ignore-not-found -o name";
pub const NS_DETAIL: &str = "get namespace metallb-system --ignore-not-found -o json";
pub const SERVICES: &str = "get services --all-namespaces";
pub const DEPLOYMENT: &str = "get deployment controller -n metallb-system";
pub const PODS: &str = "get pods -n metallb-system";
pub const POOLS: &str = "get ipaddresspools.metallb.io";
pub const NODES: &str = "get nodes";
pub const INSTALL: &str = "apply --validate=false";
pub const WAIT: &str = "wait --namespace metallb-system";
pub const DELETE: &str = "delete --ignore-not-found=true";

// ============== Fixtures ==============

pub fn json_result(value: Value) -> ExecResult {
    ExecResult::ok(value.to_string())
}

pub fn namespace_present(mock: MockExecutor) -> MockExecutor {
    mock.on_exec(NS_QUICK, ExecResult::ok("namespace/metallb-system\n"))
        .on_exec(
            NS_DETAIL,
            json_result(json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": {"name": "metallb-system"},
                "status": {"phase": "Active"}
            })),
        )
}

pub fn deployment(ready: i32, desired: i32) -> ExecResult {
    let mut status = json!({"replicas": desired});
    if ready > 0 {
        status["readyReplicas"] = json!(ready);
    }

    json_result(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": "controller",
            "namespace": "metallb-system",
            "labels": {"app": "metallb", "component": "controller", "app.kubernetes.io/version": "v0.14.8"}
        },
        "spec": {
            "replicas": desired,
            "selector": {"matchLabels": {"app": "metallb", "component": "controller"}},
            "template": {
                "metadata": {"labels": {"app": "metallb", "component": "controller"}},
                "spec": {"containers": [{"name": "controller", "image": "quay.io/metallb/controller:v0.14.8"}]}
            }
        },
        "status": status
    }))
}

pub fn pods(entries: &[(&str, &[(&str, &str)])]) -> ExecResult {
    let items: Vec<Value> = entries
        .iter()
        .enumerate()
        .map(|(i, (phase, conditions))| {
            let conditions: Vec<Value> = conditions
                .iter()
                .map(|(t, s)| json!({"type": t, "status": s}))
                .collect();
            json!({
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": {"name": format!("controller-{i}"), "namespace": "metallb-system"},
                "status": {"phase": phase, "conditions": conditions}
            })
        })
        .collect();

    json_result(json!({"apiVersion": "v1", "kind": "List", "items": items}))
}

pub fn lb_services(external_ip: Option<&str>) -> ExecResult {
    let ingress = match external_ip {
        Some(ip) => json!([{"ip": ip}]),
        None => json!([]),
    };

    json_result(json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [{
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "echo", "namespace": "default"},
            "spec": {"type": "LoadBalancer", "ports": [{"port": 8080, "protocol": "TCP"}]},
            "status": {"loadBalancer": {"ingress": ingress}}
        }]
    }))
}

pub fn ip_pools() -> ExecResult {
    json_result(json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [{
            "apiVersion": "metallb.io/v1beta1",
            "kind": "IPAddressPool",
            "metadata": {"name": "docker-desktop-pool", "namespace": "metallb-system"},
            "spec": {"addresses": ["172.18.200.1-172.18.200.100"]}
        }]
    }))
}

pub fn nodes(internal_ip: &str, labels: Value) -> ExecResult {
    json_result(json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [{
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": {"name": "node-0", "labels": labels},
            "status": {"addresses": [{"type": "InternalIP", "address": internal_ip}]}
        }]
    }))
}

/// A single unlabelled node whose `spec.providerID` is set
pub fn nodes_with_provider_id(internal_ip: &str, provider_id: &str) -> ExecResult {
    json_result(json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [{
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": {"name": "node-0"},
            "spec": {"providerID": provider_id},
            "status": {"addresses": [{"type": "InternalIP", "address": internal_ip}]}
        }]
    }))
}
