//! Configuration published by the per-host network server.
//!
//! The server owns the file; the plugin only reads it during ADD to learn
//! the MTU for new veth pairs and the destinations that need host routes
//! when a fast-path interface is present.

use std::net::IpAddr;
use std::path::Path;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::error::{CniError, Result};

/// Node-level network settings shared with every plugin invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// MTU applied to both ends of the veth pair.
    pub mtu: u32,
    /// CIDR of the cluster service network.
    #[serde(rename = "serviceNetworkCIDR")]
    pub service_network_cidr: String,
    /// Address of the cluster DNS service.
    #[serde(rename = "dnsIP")]
    pub dns_ip: String,
}

impl ServerConfig {
    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path).map_err(|e| CniError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&content).map_err(|e| CniError::Config {
            message: format!("failed to parse {}: {e}", path.display()),
        })
    }

    /// Returns the service network with host bits cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured value is not a CIDR.
    pub fn service_network(&self) -> Result<IpNetwork> {
        let cidr: IpNetwork = self
            .service_network_cidr
            .parse()
            .map_err(|e| CniError::Config {
                message: format!(
                    "failed to parse ServiceNetworkCIDR {:?}: {e}",
                    self.service_network_cidr
                ),
            })?;
        IpNetwork::new(cidr.network(), cidr.prefix()).map_err(|e| CniError::Config {
            message: format!("invalid ServiceNetworkCIDR prefix: {e}"),
        })
    }

    /// Returns the DNS service address.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured value is not an IP address.
    pub fn dns_address(&self) -> Result<IpAddr> {
        self.dns_ip.parse().map_err(|e| CniError::Config {
            message: format!("failed to parse dns IP {:?}: {e}", self.dns_ip),
        })
    }
}
