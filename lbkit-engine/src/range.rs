//! LoadBalancer address range suggestion
//!
//! Maps a node's internal IP to a block of addresses that is usually free on
//! single-node development clusters (Docker Desktop, kind). This is a
//! heuristic, not an allocator: nothing checks the suggested block against
//! the real network, so multi-node or shared clusters need an explicit range.

use crate::error::{LbError, LbResult};
use crate::executor::CommandExecutor;
use crate::resources::{self, ResourceList};
use k8s_openapi::api::core::v1::Node;
use tracing::{debug, warn};

/// Pure range heuristic
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkRangeDetector;

impl NetworkRangeDetector {
    /// Suggest a range for `node_ip`, or `None` when no pattern applies
    pub fn detect(node_ip: &str) -> Option<String> {
        let ip = node_ip.trim();
        let octets: Vec<&str> = ip.split('.').collect();

        if ip.starts_with("172.18.") {
            return Some("172.18.200.1-172.18.200.100".to_string());
        }

        if ip.starts_with("172.") {
            let second = octet(&octets, 1)?;
            return Some(format!("172.{second}.200.1-172.{second}.200.100"));
        }

        if ip.starts_with("10.") {
            let second = octet(&octets, 1)?;
            return Some(format!("10.{second}.200.1-10.{second}.200.100"));
        }

        if ip.starts_with("192.168.") {
            let third = octet(&octets, 2)?;
            return Some(format!("192.168.{third}.200-192.168.{third}.250"));
        }

        None
    }
}

fn octet<'a>(octets: &[&'a str], index: usize) -> Option<&'a str> {
    octets
        .get(index)
        .copied()
        .filter(|o| !o.is_empty() && o.parse::<u8>().is_ok())
}

/// All nodes in the cluster; empty output is an empty list
pub async fn list_nodes<E: CommandExecutor + ?Sized>(executor: &E) -> LbResult<Vec<Node>> {
    let result = executor.exec(&["get", "nodes", "-o", "json"]).await?;

    if result.is_hard_failure() {
        return Err(LbError::CommandFailed(result.failure_message()));
    }

    Ok(resources::parse_output::<ResourceList<Node>>(&result)?
        .map(|list| list.items)
        .unwrap_or_default())
}

/// InternalIP of the first node in the cluster
pub async fn first_node_internal_ip<E: CommandExecutor + ?Sized>(executor: &E) -> Option<String> {
    let nodes = match list_nodes(executor).await {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, "Failed to list nodes for range detection");
            return None;
        }
    };

    let ip = nodes.iter().find_map(resources::node_internal_ip);
    debug!(node_ip = ?ip, "Resolved node internal IP");
    ip
}
