//! LoadBalancer status command

use crate::output::{self, OutputFormat};
use anyhow::Result;
use lbkit_common::{ExternalService, IpPool, LoadBalancerStatus};
use lbkit_engine::{EngineConfig, StatusProbe};
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct PoolRow {
    name: String,
    addresses: String,
}

impl From<&IpPool> for PoolRow {
    fn from(pool: &IpPool) -> Self {
        Self {
            name: pool.name.clone(),
            addresses: pool.addresses.join(", "),
        }
    }
}

#[derive(Tabled, Serialize)]
struct ServiceRow {
    namespace: String,
    name: String,
    external_ip: String,
    ports: String,
}

impl From<&ExternalService> for ServiceRow {
    fn from(svc: &ExternalService) -> Self {
        Self {
            namespace: svc.namespace.clone(),
            name: svc.name.clone(),
            external_ip: svc.external_ip.clone(),
            ports: svc.ports.clone(),
        }
    }
}

pub async fn handle_status_command(config: &EngineConfig, output_format: &str) -> Result<()> {
    let format = OutputFormat::from_name(output_format);

    let spinner = format
        .is_table()
        .then(|| output::spinner("Checking LoadBalancer status..."));
    let status = StatusProbe::from_config(config).check_status().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    render_status(&status, format)
}

/// Print a status in the requested format
pub fn render_status(status: &LoadBalancerStatus, format: OutputFormat) -> Result<()> {
    if !format.is_table() {
        return output::print_single(status, format);
    }

    if status.is_configured {
        output::print_success("LoadBalancer is configured");
    } else {
        output::print_warning("LoadBalancer is not configured");
    }

    output::print_field("Provider", &status.provider.to_string());
    if let Some(version) = &status.version {
        output::print_field("Version", version);
    }

    match (&status.error, status.is_configured) {
        (Some(error), true) => output::print_warning(error),
        (Some(error), false) => output::print_error(error),
        (None, _) => {}
    }

    if !status.ip_pools.is_empty() {
        println!();
        println!("IP address pools:");
        output::print_table(status.ip_pools.iter().map(PoolRow::from).collect());
    }

    if !status.services.is_empty() {
        println!();
        println!("Services with external IPs:");
        output::print_table(status.services.iter().map(ServiceRow::from).collect());
    }

    if !status.is_configured {
        output::print_info("Run `lbkit configure` to install MetalLB");
    }

    Ok(())
}
