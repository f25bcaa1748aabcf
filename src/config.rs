//! Configuration loading from TOML
//!
//! # Configuration File Format
//!
//! The configuration file is TOML-formatted with the following structure:
//!
//! ```toml
//! [network]
//! bind_address = "127.0.0.1"
//! port = 26760
//! ```
//!
//! Every field is optional; an empty file yields the defaults above. DSU
//! clients (Cemu, Citra, Dolphin, melonDS) look for a server on the IPv4
//! loopback at port 26760 by default, so most deployments never need a
//! config file at all — [`Config::default`] is the same thing.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;

/// Default DSU server port, shared by every known client
pub const DEFAULT_PORT: u16 = 26760;

/// Network configuration for the UDP server
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// IPv4 address to bind
    ///
    /// **Format**: dotted quad (e.g. "127.0.0.1")
    /// **Default**: 127.0.0.1 — DSU clients connect over loopback
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// UDP port to bind
    ///
    /// **Default**: 26760 (the port DSU clients probe first). Port 0 binds
    /// an ephemeral port, which is only useful for tests.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl NetworkConfig {
    /// Resolve to a socket address, validating the bind address
    pub fn socket_addr(&self) -> Result<SocketAddrV4> {
        let ip: Ipv4Addr = self
            .bind_address
            .parse()
            .map_err(|_| Error::Config(format!("Invalid bind_address: {}", self.bind_address)))?;
        Ok(SocketAddrV4::new(ip, self.port))
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Validates that `bind_address` parses as an IPv4 address.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = basic_toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        config.network.socket_addr()?;

        Ok(config)
    }

    /// Config bound to a specific port on the loopback interface
    pub fn with_port(port: u16) -> Self {
        Self {
            network: NetworkConfig {
                port,
                ..NetworkConfig::default()
            },
        }
    }
}
