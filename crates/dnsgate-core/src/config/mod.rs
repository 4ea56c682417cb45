//! Configuration management for dnsgate
//!
//! Strongly-typed TOML configuration. Every section has defaults, so an
//! empty file is a valid configuration.

use crate::engine::FailurePolicy;
use crate::error::{Error, Result};
use crate::packet::MAX_PACKET_SIZE;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tunnel settings handed to the provider
    pub tunnel: TunnelConfig,

    /// Blocklist settings
    pub filter: FilterConfig,

    /// Session lifecycle tuning
    pub session: SessionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.tunnel.validate()?;

        if self.session.stop_timeout_ms == 0 {
            return Err(Error::config_value(
                "session.stop_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.filter.files.iter().any(|f| f.trim().is_empty()) {
            return Err(Error::config_value("filter.files", "Empty file path"));
        }

        Ok(())
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Tunnel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Name shown by the platform for the tunnel
    pub session_name: String,
    /// Local address assigned to the tunnel interface
    pub address: Ipv4Addr,
    /// Prefix length of the local address
    pub prefix_len: u8,
    /// DNS server advertised to the device
    pub dns_server: Ipv4Addr,
    /// Routes sent through the tunnel, in CIDR notation
    pub routes: Vec<String>,
    /// Largest packet read in one call
    pub max_packet_size: usize,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            session_name: "dnsgate".to_string(),
            address: Ipv4Addr::new(10, 0, 0, 2),
            prefix_len: 24,
            dns_server: Ipv4Addr::new(8, 8, 8, 8),
            routes: vec!["0.0.0.0/0".to_string()],
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl TunnelConfig {
    /// Smallest accepted `max_packet_size` (minimum IPv4 reassembly size)
    pub const MIN_PACKET_SIZE: usize = 576;

    /// Largest accepted `max_packet_size`
    pub const MAX_PACKET_SIZE: usize = 65535;

    /// Validate tunnel settings
    pub fn validate(&self) -> Result<()> {
        if self.prefix_len > 32 {
            return Err(Error::config_value("tunnel.prefix_len", "Must be 0-32"));
        }
        if !(Self::MIN_PACKET_SIZE..=Self::MAX_PACKET_SIZE).contains(&self.max_packet_size) {
            return Err(Error::config_value(
                "tunnel.max_packet_size",
                format!(
                    "Must be between {} and {}",
                    Self::MIN_PACKET_SIZE,
                    Self::MAX_PACKET_SIZE
                ),
            ));
        }
        if self.routes.is_empty() {
            return Err(Error::config_value("tunnel.routes", "At least one route is required"));
        }
        self.parsed_routes().map(|_| ())
    }

    /// Routes as `(network, prefix_len)` pairs
    pub fn parsed_routes(&self) -> Result<Vec<(Ipv4Addr, u8)>> {
        self.routes.iter().map(|r| parse_route(r)).collect()
    }
}

/// Parse a CIDR route such as `0.0.0.0/0`
///
/// A bare address is taken as a host route (`/32`).
pub fn parse_route(route: &str) -> Result<(Ipv4Addr, u8)> {
    let invalid = |message: &str| Error::config_value("tunnel.routes", format!("'{route}': {message}"));

    let (addr, prefix) = match route.trim().split_once('/') {
        Some((addr, prefix)) => (addr, prefix),
        None => (route.trim(), "32"),
    };
    let addr: Ipv4Addr = addr.parse().map_err(|_| invalid("invalid IPv4 address"))?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid("invalid prefix length"))?;
    if prefix > 32 {
        return Err(invalid("prefix length must be 0-32"));
    }
    Ok((addr, prefix))
}

/// Blocklist settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Inline entries (domains or URLs)
    pub domains: Vec<String>,
    /// List files (plain, hosts format or JSON array)
    pub files: Vec<String>,
    /// Verdict for packets that cannot be classified
    pub failure_policy: FailurePolicy,
    /// Seconds between list file change checks (0 = never)
    pub reload_interval_secs: u64,
}

/// Session lifecycle tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long `stop` waits for the worker before detaching it
    pub stop_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: 2000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path (None = stderr only)
    pub file: Option<String>,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json_format: false,
        }
    }
}
