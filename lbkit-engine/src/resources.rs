//! Typed views of kubectl JSON output
//!
//! kubectl prints collections as a generic `{"kind":"List","items":[...]}`,
//! so lists are read through [`ResourceList`] rather than the typed
//! `*List` kinds. Single objects deserialize straight into the
//! `k8s-openapi` models.

use crate::error::LbResult;
use crate::executor::ExecResult;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use lbkit_common::{ExternalService, IpPool};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Label carrying the controller release on the MetalLB deployment
pub const VERSION_LABEL: &str = "app.kubernetes.io/version";

/// Node labels only cloud providers set
const CLOUD_NODE_LABELS: &[&str] = &[
    "node.kubernetes.io/instance-type",
    "topology.kubernetes.io/zone",
    "kubernetes.io/cloud-provider",
    "node.kubernetes.io/cloud-provider",
];

/// providerID prefixes used by local development clusters
const LOCAL_PROVIDER_IDS: &[&str] = &["kind://", "docker-desktop", "k3s://", "minikube"];

/// Generic kubectl list output
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// `ipaddresspools.metallb.io` custom resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpAddressPool {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: IpAddressPoolSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpAddressPoolSpec {
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Parse the stdout of `result` as a single JSON document
///
/// Empty output (the `--ignore-not-found` miss case) is `Ok(None)`.
pub fn parse_output<T: DeserializeOwned>(result: &ExecResult) -> LbResult<Option<T>> {
    match result.data_text() {
        Some(text) => Ok(Some(serde_json::from_str(text)?)),
        None => Ok(None),
    }
}

/// LoadBalancer Services that already hold an external address
pub fn external_services(services: &[Service]) -> Vec<ExternalService> {
    services
        .iter()
        .filter(|svc| {
            svc.spec
                .as_ref()
                .and_then(|spec| spec.type_.as_deref())
                .is_some_and(|t| t == "LoadBalancer")
        })
        .filter_map(|svc| {
            let external_ip = svc
                .status
                .as_ref()
                .and_then(|s| s.load_balancer.as_ref())
                .and_then(|lb| lb.ingress.as_ref())
                .and_then(|ingress| {
                    ingress.iter().find_map(|entry| {
                        non_empty(entry.ip.as_deref()).or_else(|| non_empty(entry.hostname.as_deref()))
                    })
                })?;

            let ports = svc
                .spec
                .as_ref()
                .and_then(|spec| spec.ports.as_ref())
                .map(|ports| {
                    ports
                        .iter()
                        .map(|p| format!("{}/{}", p.port, p.protocol.as_deref().unwrap_or("TCP")))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();

            Some(ExternalService {
                name: svc.metadata.name.clone().unwrap_or_default(),
                namespace: svc.metadata.namespace.clone().unwrap_or_default(),
                external_ip: external_ip.to_string(),
                ports,
            })
        })
        .collect()
}

/// `Running` and either `Ready=True` or `ContainersReady=True`
///
/// Pod `Ready` can trail container readiness, so either condition counts.
pub fn is_tolerated_ready(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };

    if status.phase.as_deref() != Some("Running") {
        return false;
    }

    status.conditions.as_ref().is_some_and(|conditions| {
        conditions.iter().any(|c| {
            (c.type_ == "Ready" || c.type_ == "ContainersReady") && c.status == "True"
        })
    })
}

/// Ready and desired replica counts, defaulting to zero
pub fn replica_counts(deployment: &Deployment) -> (i32, i32) {
    let ready = deployment
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(0);
    (ready, desired)
}

pub fn deployment_version(deployment: &Deployment) -> String {
    deployment
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(VERSION_LABEL))
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn ip_pools(pools: Vec<IpAddressPool>) -> Vec<IpPool> {
    pools
        .into_iter()
        .map(|pool| IpPool {
            name: pool.metadata.name.unwrap_or_else(|| "unknown".to_string()),
            addresses: pool.spec.addresses,
        })
        .collect()
}

/// First `InternalIP` reported by the node
pub fn node_internal_ip(node: &Node) -> Option<String> {
    node.status
        .as_ref()?
        .addresses
        .as_ref()?
        .iter()
        .find(|a| a.type_ == "InternalIP")
        .map(|a| a.address.clone())
}

/// Whether the node looks like it runs on a cloud provider
pub fn node_indicates_cloud(node: &Node) -> bool {
    let labelled = node
        .metadata
        .labels
        .as_ref()
        .is_some_and(|labels| CLOUD_NODE_LABELS.iter().any(|l| labels.contains_key(*l)));

    let cloud_provider_id = node
        .spec
        .as_ref()
        .and_then(|spec| non_empty(spec.provider_id.as_deref()))
        .is_some_and(|id| !LOCAL_PROVIDER_IDS.iter().any(|local| id.starts_with(local)));

    labelled || cloud_provider_id
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn services(value: serde_json::Value) -> Vec<Service> {
        serde_json::from_value::<ResourceList<Service>>(value).unwrap().items
    }

    fn pod(phase: &str, conditions: &[(&str, &str)]) -> Pod {
        let conditions: Vec<_> = conditions
            .iter()
            .map(|(t, s)| json!({"type": t, "status": s}))
            .collect();
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "controller-abc"},
            "status": {"phase": phase, "conditions": conditions}
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_output_empty_is_none() {
        let parsed: Option<Deployment> = parse_output(&ExecResult::ok("")).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_parse_output_garbage_is_error() {
        let parsed: LbResult<Option<Deployment>> =
            parse_output(&ExecResult::ok("error: the server doesn't have a resource type"));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_kubectl_list_kind_parses() {
        let list = services(json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [],
            "metadata": {"resourceVersion": ""}
        }));
        assert!(list.is_empty());
    }

    #[test]
    fn test_external_services_requires_address() {
        let list = services(json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [
                {
                    "apiVersion": "v1", "kind": "Service",
                    "metadata": {"name": "web", "namespace": "default"},
                    "spec": {"type": "LoadBalancer", "ports": [{"port": 80, "protocol": "TCP"}, {"port": 443}]},
                    "status": {"loadBalancer": {"ingress": [{"ip": "172.18.200.1"}]}}
                },
                {
                    "apiVersion": "v1", "kind": "Service",
                    "metadata": {"name": "pending", "namespace": "default"},
                    "spec": {"type": "LoadBalancer"},
                    "status": {"loadBalancer": {}}
                },
                {
                    "apiVersion": "v1", "kind": "Service",
                    "metadata": {"name": "internal", "namespace": "default"},
                    "spec": {"type": "ClusterIP"},
                    "status": {"loadBalancer": {"ingress": [{"ip": "10.0.0.1"}]}}
                }
            ]
        }));

        let found = external_services(&list);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "web");
        assert_eq!(found[0].external_ip, "172.18.200.1");
        assert_eq!(found[0].ports, "80/TCP, 443/TCP");
    }

    #[test]
    fn test_external_services_accepts_hostname() {
        let list = services(json!({
            "items": [{
                "apiVersion": "v1", "kind": "Service",
                "metadata": {"name": "elb", "namespace": "prod"},
                "spec": {"type": "LoadBalancer"},
                "status": {"loadBalancer": {"ingress": [{"hostname": "a1b2.elb.amazonaws.com"}]}}
            }]
        }));

        let found = external_services(&list);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].external_ip, "a1b2.elb.amazonaws.com");
    }

    #[test]
    fn test_tolerated_ready_conditions() {
        assert!(is_tolerated_ready(&pod("Running", &[("Ready", "True")])));
        assert!(is_tolerated_ready(&pod(
            "Running",
            &[("Ready", "False"), ("ContainersReady", "True")]
        )));
        assert!(!is_tolerated_ready(&pod("Running", &[("Ready", "False")])));
        assert!(!is_tolerated_ready(&pod("Pending", &[("ContainersReady", "True")])));
    }

    #[test]
    fn test_replica_counts_default_to_zero() {
        let deployment: Deployment = serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "controller"},
            "status": {}
        }))
        .unwrap();
        assert_eq!(replica_counts(&deployment), (0, 0));
        assert_eq!(deployment_version(&deployment), "unknown");
    }

    #[test]
    fn test_ip_pools_mapping() {
        let list: ResourceList<IpAddressPool> = serde_json::from_value(json!({
            "items": [
                {"metadata": {"name": "docker-desktop-pool"}, "spec": {"addresses": ["172.18.200.1-172.18.200.100"]}},
                {"metadata": {"name": "empty"}}
            ]
        }))
        .unwrap();

        let pools = ip_pools(list.items);
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].addresses, vec!["172.18.200.1-172.18.200.100"]);
        assert!(pools[1].addresses.is_empty());
    }

    #[test]
    fn test_node_cloud_detection() {
        let kind: Node = serde_json::from_value(json!({
            "apiVersion": "v1", "kind": "Node",
            "metadata": {"name": "kind-control-plane", "labels": {"kubernetes.io/hostname": "kind"}},
            "spec": {"providerID": "kind://docker/kind/kind-control-plane"},
            "status": {"addresses": [{"type": "Hostname", "address": "kind"}, {"type": "InternalIP", "address": "172.18.0.2"}]}
        }))
        .unwrap();
        assert!(!node_indicates_cloud(&kind));
        assert_eq!(node_internal_ip(&kind).as_deref(), Some("172.18.0.2"));

        let eks: Node = serde_json::from_value(json!({
            "apiVersion": "v1", "kind": "Node",
            "metadata": {"name": "ip-10-0-1-5", "labels": {"topology.kubernetes.io/zone": "us-east-1a"}}
        }))
        .unwrap();
        assert!(node_indicates_cloud(&eks));
    }

    #[test]
    fn test_provider_id_alone_decides_cloud() {
        let node = |provider_id: &str| -> Node {
            serde_json::from_value(json!({
                "apiVersion": "v1", "kind": "Node",
                "metadata": {"name": "node-1"},
                "spec": {"providerID": provider_id}
            }))
            .unwrap()
        };

        assert!(node_indicates_cloud(&node("aws:///us-east-1a/i-0abc123def")));
        assert!(node_indicates_cloud(&node("gce://project/us-central1-a/vm-1")));
        assert!(!node_indicates_cloud(&node("docker-desktop")));
        assert!(!node_indicates_cloud(&node("k3s://lab-node")));
        assert!(!node_indicates_cloud(&node("   ")));
    }
}
