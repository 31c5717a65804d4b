//! MetalLB remove command

use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use dialoguer::Confirm;
use lbkit_engine::{EngineConfig, ProvisioningWorkflow};

pub async fn handle_remove_command(
    yes: bool,
    config: &EngineConfig,
    output_format: &str,
) -> Result<()> {
    let format = OutputFormat::from_name(output_format);

    if !yes {
        let confirm = Confirm::new()
            .with_prompt("Remove MetalLB and every Service address it assigned?")
            .default(false)
            .interact()?;

        if !confirm {
            output::print_info("Removal aborted");
            return Ok(());
        }
    }

    let spinner = format.is_table().then(|| output::spinner("Removing MetalLB..."));
    let result = ProvisioningWorkflow::from_config(config).remove().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if !format.is_table() {
        output::print_single(&result, format)?;
    }

    if !result.success {
        bail!(
            "failed to remove MetalLB: {}",
            result.error.unwrap_or_default()
        );
    }

    if format.is_table() {
        output::print_success("MetalLB removed");
    }

    Ok(())
}
