//! lbkit CLI
//!
//! Detects and provisions a LoadBalancer implementation for local Kubernetes clusters

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lbkit_engine::logging::LoggingConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table", global = true)]
    output: String,

    /// kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the cluster can assign external IPs
    Status,
    /// Install MetalLB if needed and configure an address pool
    Configure {
        /// Address range (e.g., 172.18.200.1-172.18.200.100)
        #[arg(short, long, conflicts_with = "auto")]
        range: Option<String>,
        /// Derive the range from the first node's internal IP (default)
        #[arg(long)]
        auto: bool,
        /// Re-check status once configuration has settled
        #[arg(short, long)]
        wait: bool,
        /// Seconds to wait before re-checking status
        #[arg(long, default_value_t = 3)]
        reprobe_delay: u64,
    },
    /// Remove MetalLB from the cluster
    Remove {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Suggest an address range for the cluster network
    DetectRange {
        /// Use this node IP instead of asking the cluster
        #[arg(long)]
        node_ip: Option<String>,
    },
    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    // Load config
    let overrides = config::CliOverrides {
        config: cli.config.clone(),
        context: cli.context.clone(),
        kubeconfig: cli.kubeconfig.clone(),
    };
    let config = config::load(&overrides)?;

    // Flushes the log file on exit
    let _log_guard = LoggingConfig::from(&config.logging)
        .init()
        .map_err(|e| anyhow::anyhow!(e))?;
    tracing::debug!(?config, "Resolved configuration");

    // Execute command
    match cli.command {
        Commands::Status => commands::status::handle_status_command(&config, &cli.output).await?,
        Commands::Configure {
            range,
            auto,
            wait,
            reprobe_delay,
        } => {
            let request = commands::configure::ConfigureRequest {
                range: if auto { None } else { range },
                wait,
                reprobe_delay,
            };
            commands::configure::handle_configure_command(request, &config, &cli.output).await?
        }
        Commands::Remove { yes } => {
            commands::remove::handle_remove_command(yes, &config, &cli.output).await?
        }
        Commands::DetectRange { node_ip } => {
            commands::range::handle_detect_range_command(node_ip, &config, &cli.output).await?
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Generate shell completions
fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
}
