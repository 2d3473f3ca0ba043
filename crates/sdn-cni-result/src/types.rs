//! Building blocks shared by every result schema version.

use std::fmt;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Address family of an IP configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpFamily {
    /// IPv4.
    #[serde(rename = "4")]
    V4,
    /// IPv6.
    #[serde(rename = "6")]
    V6,
}

impl IpFamily {
    /// Returns the family of a network.
    pub const fn of(network: &IpNetwork) -> Self {
        match network {
            IpNetwork::V4(_) => Self::V4,
            IpNetwork::V6(_) => Self::V6,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "4"),
            Self::V6 => write!(f, "6"),
        }
    }
}

/// A route to install in the sandbox.
///
/// A missing `gw` means the route carries no explicit next hop; it is never
/// filled in from another field during conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Destination network.
    pub dst: IpNetwork,
    /// Next hop, if the route declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gw: Option<IpAddr>,
}

/// DNS settings handed back to the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dns {
    /// Name server addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,
    /// Local domain.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    /// Search domains.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
    /// Resolver options.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Dns {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.nameservers.is_empty()
            && self.domain.is_empty()
            && self.search.is_empty()
            && self.options.is_empty()
    }
}

/// An interface created or configured by the plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Interface name.
    pub name: String,
    /// Hardware address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mac: String,
    /// Namespace path for sandbox interfaces; empty for host interfaces.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sandbox: String,
}

/// One address assigned to an interface, current schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpConfig {
    /// Address family.
    pub version: IpFamily,
    /// Index into the result's interface list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<usize>,
    /// Address with prefix length.
    pub address: IpNetwork,
    /// Gateway of this address's family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
}

/// One address family's configuration, legacy schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpBlock {
    /// Address with prefix length.
    pub ip: IpNetwork,
    /// Gateway of this family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
    /// Routes reachable through this family.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_serializes_as_digit() {
        assert_eq!(serde_json::to_string(&IpFamily::V4).unwrap(), "\"4\"");
        assert_eq!(serde_json::to_string(&IpFamily::V6).unwrap(), "\"6\"");
    }

    #[test]
    fn route_without_gateway_omits_gw() {
        let route = Route {
            dst: "10.128.0.0/14".parse().unwrap(),
            gw: None,
        };
        assert_eq!(serde_json::to_string(&route).unwrap(), r#"{"dst":"10.128.0.0/14"}"#);
    }

    #[test]
    fn address_keeps_host_bits() {
        let ip: IpConfig =
            serde_json::from_str(r#"{"version":"4","address":"10.128.2.7/23","gateway":"10.128.2.1"}"#)
                .unwrap();
        assert_eq!(ip.address.ip().to_string(), "10.128.2.7");
        assert_eq!(ip.address.prefix(), 23);
        assert_eq!(IpFamily::of(&ip.address), IpFamily::V4);
    }

    #[test]
    fn empty_dns_serializes_as_empty_object() {
        assert_eq!(serde_json::to_string(&Dns::default()).unwrap(), "{}");
        assert!(Dns::default().is_empty());
    }
}
