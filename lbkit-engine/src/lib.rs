//! lbkit engine
//!
//! Detects whether a Kubernetes cluster can assign external addresses to
//! Services of type LoadBalancer, and installs and configures MetalLB when it
//! cannot. All cluster access goes through a [`CommandExecutor`], so the
//! engine runs against kubectl in production and against scripted doubles in
//! tests.

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Cluster access
pub mod executor;
pub mod resources;

// Detection and provisioning
pub mod metallb;
pub mod range;

pub use config::EngineConfig;
pub use error::{LbError, LbResult};
pub use executor::{CommandExecutor, ExecResult, KubectlExecutor};
pub use metallb::{ProvisioningWorkflow, StatusProbe};
pub use range::NetworkRangeDetector;
