//! Current result schema (0.3.0 onwards): flat address and route lists.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use sdn_cni_common::error::{CniError, Result};

use crate::types::{Dns, Interface, IpConfig, IpFamily, Route};

/// Result in the plugin's internal, multi-address form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentResult {
    /// Declared schema version.
    #[serde(rename = "cniVersion", default)]
    pub cni_version: String,
    /// Interfaces the result refers to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<Interface>,
    /// Assigned addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<IpConfig>,
    /// Routes to install.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    /// DNS settings.
    #[serde(default)]
    pub dns: Dns,
}

impl CurrentResult {
    /// Returns the single IPv4 address of a pod result.
    ///
    /// # Errors
    ///
    /// Fails unless the result holds exactly one address and it is IPv4.
    pub fn sole_ipv4(&self) -> Result<&IpConfig> {
        match self.ips.as_slice() {
            [ip] if ip.version == IpFamily::V4 => Ok(ip),
            ips => Err(CniError::Conversion {
                message: format!(
                    "failed to convert IPAM result: expected exactly one IPv4 address, got {}",
                    ips.len()
                ),
            }),
        }
    }

    /// Returns the host address of the single IPv4 address.
    ///
    /// # Errors
    ///
    /// Fails unless the result holds exactly one address and it is IPv4.
    pub fn sole_ipv4_addr(&self) -> Result<Ipv4Addr> {
        let address = self.sole_ipv4()?.address;
        match address.ip() {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(_) => Err(CniError::Conversion {
                message: format!("expected an IPv4 address, got {address}"),
            }),
        }
    }

    /// Removes the default gateway from the sole IPv4 address and returns it.
    ///
    /// Routes without an explicit next hop would otherwise be installed via
    /// that gateway.
    ///
    /// # Errors
    ///
    /// Fails unless the result holds exactly one IPv4 address.
    pub fn take_default_gateway(&mut self) -> Result<Option<Ipv4Addr>> {
        let _ = self.sole_ipv4()?;
        let gateway = self.ips[0].gateway.take();
        match gateway {
            None => Ok(None),
            Some(IpAddr::V4(gw)) => Ok(Some(gw)),
            Some(IpAddr::V6(gw)) => Err(CniError::Conversion {
                message: format!("IPv4 address carries IPv6 gateway {gw}"),
            }),
        }
    }

    /// Replaces the interface list with the sandbox interface and binds the
    /// sole address to it.
    pub fn attach_sandbox_interface(&mut self, interface: Interface) {
        self.interfaces = vec![interface];
        for ip in &mut self.ips {
            ip.interface = Some(0);
        }
    }
}
