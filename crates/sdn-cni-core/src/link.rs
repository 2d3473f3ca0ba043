//! Kernel link, address, and route operations used by the plugin.
//!
//! Every operation acts on the network namespace of the calling thread.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use ipnetwork::IpNetwork;

use sdn_cni_common::error::Result;

/// Attributes of an existing link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    /// Interface index.
    pub index: u32,
    /// Index of the parent link for stacked devices such as macvlan.
    pub parent_index: Option<u32>,
}

/// A route to program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    /// Destination network.
    pub dst: IpNetwork,
    /// Next hop; `None` installs an on-link route.
    pub gw: Option<IpAddr>,
    /// Output device, if the route is bound to one.
    pub dev: Option<String>,
}

/// Link-level primitives the plugin depends on.
pub trait LinkOps {
    /// Creates a veth pair. The host end stays in the current namespace,
    /// the container end is created inside `container_ns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pair cannot be created.
    fn create_veth_pair(
        &self,
        host_name: &str,
        container_name: &str,
        mtu: u32,
        container_ns: &Path,
    ) -> Result<()>;

    /// Deletes a link; a veth deletion removes both ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be deleted.
    fn delete_link(&self, name: &str) -> Result<()>;

    /// Looks up a link by name, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    fn link_by_name(&self, name: &str) -> Result<Option<LinkInfo>>;

    /// Sets a link administratively up.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be brought up.
    fn set_link_up(&self, name: &str) -> Result<()>;

    /// Sets a link's hardware address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be set.
    fn set_hw_addr(&self, name: &str, mac: &str) -> Result<()>;

    /// Adds an address with prefix to a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be added.
    fn add_address(&self, name: &str, address: &IpNetwork) -> Result<()>;

    /// Installs a route. A route that already exists counts as installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the route cannot be installed.
    fn add_route(&self, route: &RouteSpec) -> Result<()>;

    /// Lists the IPv4 addresses assigned to the link with `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if addresses cannot be listed.
    fn ipv4_addresses(&self, index: u32) -> Result<Vec<Ipv4Addr>>;
}
