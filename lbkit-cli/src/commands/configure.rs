//! MetalLB configure command

use super::status::render_status;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use lbkit_common::LoadBalancerConfiguration;
use lbkit_engine::{EngineConfig, ProvisioningWorkflow};
use std::time::Duration;

/// Parsed `configure` arguments
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    /// Explicit range; auto-detect when `None`
    pub range: Option<String>,
    pub wait: bool,
    pub reprobe_delay: u64,
}

impl ConfigureRequest {
    pub fn to_configuration(&self) -> LoadBalancerConfiguration {
        match &self.range {
            Some(range) => LoadBalancerConfiguration::with_range(range.clone()),
            None => LoadBalancerConfiguration::auto_detect(),
        }
    }
}

pub async fn handle_configure_command(
    request: ConfigureRequest,
    config: &EngineConfig,
    output_format: &str,
) -> Result<()> {
    let format = OutputFormat::from_name(output_format);
    let workflow = ProvisioningWorkflow::from_config(config);

    let spinner = format.is_table().then(|| {
        output::spinner(match &request.range {
            Some(range) => format!("Configuring MetalLB with range {}...", range),
            None => "Configuring MetalLB with a detected range...".to_string(),
        })
    });
    let result = workflow.configure(&request.to_configuration()).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if !format.is_table() {
        output::print_single(&result, format)?;
    }

    if !result.success {
        bail!(
            "{}",
            result
                .error
                .unwrap_or_else(|| "MetalLB configuration failed".to_string())
        );
    }

    if format.is_table() {
        output::print_success("MetalLB configured");
    }

    if !request.wait {
        if format.is_table() {
            output::print_info("Run `lbkit status` to confirm external IPs are assigned");
        }
        return Ok(());
    }

    // Controller and speaker pick up new pools asynchronously
    let spinner = format.is_table().then(|| {
        output::spinner(format!(
            "Waiting {}s before re-checking status...",
            request.reprobe_delay
        ))
    });
    tokio::time::sleep(Duration::from_secs(request.reprobe_delay)).await;
    let status = workflow.probe().check_status().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    render_status(&status, format)?;

    if !status.is_configured && format.is_table() {
        output::print_warning("Not reporting as configured yet; re-run `lbkit status` shortly");
    }

    Ok(())
}
