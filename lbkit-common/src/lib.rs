//! Common types shared between lbkit-engine and lbkit-cli

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Best-effort classification of whatever hands out LoadBalancer addresses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Metallb,
    Cloud,
    Unknown,
    #[default]
    Absent,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Metallb => "metallb",
            Provider::Cloud => "cloud",
            Provider::Unknown => "unknown",
            Provider::Absent => "absent",
        };
        f.write_str(name)
    }
}

/// An address pool the controller may hand out from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpPool {
    pub name: String,
    pub addresses: Vec<String>,
}

/// A Service of type LoadBalancer that already received an external address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalService {
    pub name: String,
    pub namespace: String,
    pub external_ip: String,
    /// Rendered as `80/TCP, 443/TCP`
    pub ports: String,
}

/// Result of a LoadBalancer status probe
///
/// Built fresh on every probe; callers never receive a shared, mutable value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerStatus {
    pub is_configured: bool,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub ip_pools: Vec<IpPool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ExternalService>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadBalancerStatus {
    /// Nothing able to hand out external addresses was found
    pub fn not_configured() -> Self {
        Self::default()
    }

    /// A configured status attributed to `provider`
    pub fn configured(provider: Provider) -> Self {
        Self {
            is_configured: true,
            provider,
            ..Default::default()
        }
    }

    /// A failed status attributed to `provider` with a diagnostic message
    pub fn failed(provider: Provider, error: impl Into<String>) -> Self {
        Self {
            is_configured: false,
            provider,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_services(mut self, services: Vec<ExternalService>) -> Self {
        self.services = services;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Controllers the provisioning workflow knows how to install
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalancerProvider {
    #[default]
    Metallb,
}

/// Caller-supplied input to the provisioning workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerConfiguration {
    pub provider: LoadBalancerProvider,
    /// `A.B.C.D-A.B.C.D`; ignored when `auto_detect_range` is set
    #[serde(default)]
    pub ip_range: String,
    #[serde(default)]
    pub auto_detect_range: bool,
}

impl LoadBalancerConfiguration {
    pub fn with_range(ip_range: impl Into<String>) -> Self {
        Self {
            provider: LoadBalancerProvider::Metallb,
            ip_range: ip_range.into(),
            auto_detect_range: false,
        }
    }

    pub fn auto_detect() -> Self {
        Self {
            provider: LoadBalancerProvider::Metallb,
            ip_range: String::new(),
            auto_detect_range: true,
        }
    }
}

/// Inclusive IPv4 address range written as `start-end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl IpRange {
    /// Number of addresses covered by the range
    pub fn address_count(&self) -> u64 {
        u64::from(u32::from(self.end)) - u64::from(u32::from(self.start)) + 1
    }
}

impl FromStr for IpRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| Error::Validation(format!("expected A.B.C.D-A.B.C.D, got '{}'", s)))?;

        let parse = |part: &str| {
            part.trim()
                .parse::<Ipv4Addr>()
                .map_err(|_| Error::Validation(format!("'{}' is not an IPv4 address", part.trim())))
        };

        let range = IpRange {
            start: parse(start)?,
            end: parse(end)?,
        };

        if range.start > range.end {
            return Err(Error::Validation(format!(
                "range start {} is after end {}",
                range.start, range.end
            )));
        }

        Ok(range)
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Outcome of a mutating operation (configure, remove)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
