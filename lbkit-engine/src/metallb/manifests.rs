//! MetalLB resource generation
//!
//! Renders the IPAddressPool and L2Advertisement applied by `configure`.

use crate::error::{LbError, LbResult};
use serde::Serialize;
use std::collections::BTreeMap;

const METALLB_API_VERSION: &str = "metallb.io/v1beta1";

/// Render an IPAddressPool holding a single address range
pub fn ip_address_pool(name: &str, namespace: &str, range: &str) -> LbResult<String> {
    let pool = IpAddressPool {
        api_version: METALLB_API_VERSION,
        kind: "IPAddressPool",
        metadata: Metadata::new(name, namespace),
        spec: IpAddressPoolSpec {
            addresses: vec![range.to_string()],
        },
    };

    to_yaml(&pool)
}

/// Render an L2Advertisement announcing `pool`
pub fn l2_advertisement(name: &str, namespace: &str, pool: &str) -> LbResult<String> {
    let advertisement = L2Advertisement {
        api_version: METALLB_API_VERSION,
        kind: "L2Advertisement",
        metadata: Metadata::new(name, namespace),
        spec: L2AdvertisementSpec {
            ip_address_pools: vec![pool.to_string()],
        },
    };

    to_yaml(&advertisement)
}

fn to_yaml<T: Serialize>(resource: &T) -> LbResult<String> {
    serde_yaml::to_string(resource)
        .map_err(|e| LbError::Parse(format!("failed to render manifest: {}", e)))
}

fn managed_by_labels() -> BTreeMap<&'static str, &'static str> {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/managed-by", "lbkit");
    labels
}

// =============================================================================
// MetalLB CRD Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IpAddressPool<'a> {
    api_version: &'a str,
    kind: &'a str,
    metadata: Metadata<'a>,
    spec: IpAddressPoolSpec,
}

#[derive(Debug, Serialize)]
struct IpAddressPoolSpec {
    addresses: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct L2Advertisement<'a> {
    api_version: &'a str,
    kind: &'a str,
    metadata: Metadata<'a>,
    spec: L2AdvertisementSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct L2AdvertisementSpec {
    ip_address_pools: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    name: &'a str,
    namespace: &'a str,
    labels: BTreeMap<&'static str, &'static str>,
}

impl<'a> Metadata<'a> {
    fn new(name: &'a str, namespace: &'a str) -> Self {
        Self {
            name,
            namespace,
            labels: managed_by_labels(),
        }
    }
}
