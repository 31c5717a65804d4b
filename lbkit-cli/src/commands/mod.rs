//! Subcommand handlers

pub mod configure;
pub mod range;
pub mod remove;
pub mod status;
