//! Sandbox network setup for ADD.
//!
//! [`NamespaceConfigurator`] owns the ordering of namespace switches: the
//! veth pair is created from the host namespace, everything else happens
//! inside the container namespace, with a short hop back to the host
//! namespace to read the fast-path parent's addresses.

use sdn_cni_common::constants::LOOPBACK_INTERFACE;
use sdn_cni_common::error::{CniError, Result};
use sdn_cni_result::CurrentResult;

use crate::fastpath::{self, FastPathTargets};
use crate::ipam;
use crate::link::LinkOps;
use crate::namespace::{self, NetNamespace};
use crate::veth;

/// Configures one sandbox interface.
pub struct NamespaceConfigurator<'a> {
    links: &'a dyn LinkOps,
    host_ns: &'a dyn NetNamespace,
    container_ns: &'a dyn NetNamespace,
    ifname: &'a str,
}

impl<'a> NamespaceConfigurator<'a> {
    /// Creates a configurator for `ifname` inside `container_ns`.
    pub fn new(
        links: &'a dyn LinkOps,
        host_ns: &'a dyn NetNamespace,
        container_ns: &'a dyn NetNamespace,
        ifname: &'a str,
    ) -> Self {
        Self {
            links,
            host_ns,
            container_ns,
            ifname,
        }
    }

    /// Creates the host/container veth pair and brings the host end up.
    ///
    /// Returns the generated host-side name.
    ///
    /// # Errors
    ///
    /// Returns an error if the pair cannot be created or brought up.
    pub fn create_veth_pair(&self, mtu: u32) -> Result<String> {
        let host_veth = veth::random_host_veth_name();
        namespace::within(self.host_ns, || {
            self.links
                .create_veth_pair(&host_veth, self.ifname, mtu, self.container_ns.path())
                .map_err(|e| CniError::kernel("create container veth", e))?;
            self.links.set_link_up(&host_veth)
        })?;
        tracing::info!(host_veth = %host_veth, ifname = self.ifname, mtu, "created veth pair");
        Ok(host_veth)
    }

    /// Removes a host veth left behind by a failed ADD.
    ///
    /// Failures are logged; the caller's original error takes precedence.
    pub fn remove_host_veth(&self, host_veth: &str) {
        let removed = namespace::within(self.host_ns, || self.links.delete_link(host_veth));
        match removed {
            Ok(()) => tracing::info!(host_veth, "removed orphaned host veth"),
            Err(e) => tracing::warn!(host_veth, error = %e, "failed to remove host veth"),
        }
    }

    /// Applies `result` inside the container namespace.
    ///
    /// `mac` is set on the sandbox interface first. `result` must already
    /// have its default gateway stripped; the gateway travels in `targets`
    /// for the fast-path routes. Returns the number of fast-path routes
    /// installed.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; earlier steps are not undone.
    pub fn configure(
        &self,
        mac: &str,
        result: &CurrentResult,
        targets: &FastPathTargets,
    ) -> Result<usize> {
        namespace::within(self.container_ns, || {
            self.links
                .set_hw_addr(self.ifname, mac)
                .map_err(|e| CniError::kernel("set pod interface MAC address", e))?;
            ipam::configure_interface(self.links, self.ifname, result)
                .map_err(|e| CniError::kernel("configure container IPAM", e))?;

            self.links
                .set_link_up(LOOPBACK_INTERFACE)
                .map_err(|e| CniError::kernel("configure container loopback", e))?;

            fastpath::configure_fast_path(self.links, self.host_ns, targets)
        })
    }
}
