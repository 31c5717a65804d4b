//! Address range suggestion command

use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use lbkit_engine::range::{self, NetworkRangeDetector};
use lbkit_engine::{EngineConfig, KubectlExecutor};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RangeSuggestion {
    node_ip: String,
    range: String,
}

pub async fn handle_detect_range_command(
    node_ip: Option<String>,
    config: &EngineConfig,
    output_format: &str,
) -> Result<()> {
    let format = OutputFormat::from_name(output_format);

    let node_ip = match node_ip {
        Some(ip) => ip,
        None => {
            let executor = KubectlExecutor::new(&config.kubectl);
            match range::first_node_internal_ip(&executor).await {
                Some(ip) => ip,
                None => bail!("unable to determine IP range: no node internal IP found"),
            }
        }
    };

    let Some(range) = NetworkRangeDetector::detect(&node_ip) else {
        bail!(
            "unable to determine IP range for node IP {}; pass an explicit --range to `lbkit configure`",
            node_ip
        );
    };

    if format.is_table() {
        output::print_field("Node IP", &node_ip);
        output::print_field("Suggested range", &range);
        output::print_info(&format!("Apply with: lbkit configure --range {}", range));
    } else {
        output::print_single(&RangeSuggestion { node_ip, range }, format)?;
    }

    Ok(())
}
