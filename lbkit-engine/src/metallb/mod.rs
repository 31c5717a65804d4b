//! MetalLB detection and provisioning
//!
//! - [`probe`]: read-only status detection
//! - [`provision`]: install, configure and remove
//! - [`classify`]: success classification for apply output
//! - [`manifests`]: IPAddressPool and L2Advertisement rendering

pub mod classify;
pub mod manifests;
pub mod probe;
pub mod provision;

pub use classify::{classify, ApplyOutcome, ApplyVerb};
pub use probe::{ControllerCheck, StatusProbe};
pub use provision::{ProvisionError, ProvisioningWorkflow};
