//! Applies an IPAM result to a sandbox interface.

use std::net::IpAddr;

use sdn_cni_common::error::{CniError, Result};
use sdn_cni_result::CurrentResult;
use sdn_cni_result::types::IpFamily;

use crate::link::{LinkOps, RouteSpec};

/// Brings `ifname` up and programs the addresses and routes of `result`.
///
/// Addresses are added only when their interface index points at an entry
/// named `ifname`. A route without a next hop falls back to the gateway of
/// its family's address; with no such gateway it is installed on-link.
///
/// # Errors
///
/// Returns an error if the link is missing, an address references another
/// interface, or any kernel operation fails.
pub fn configure_interface(links: &dyn LinkOps, ifname: &str, result: &CurrentResult) -> Result<()> {
    if links.link_by_name(ifname)?.is_none() {
        return Err(CniError::kernel(format!("look up {ifname:?}"), "link not found"));
    }
    links.set_link_up(ifname)?;

    let mut gw_v4: Option<IpAddr> = None;
    let mut gw_v6: Option<IpAddr> = None;
    for ip in &result.ips {
        let Some(index) = ip.interface else { continue };
        if result.interfaces.get(index).is_none_or(|i| i.name != ifname) {
            return Err(CniError::kernel(
                format!("add IP addr {} to {ifname:?}", ip.address),
                "invalid interface index",
            ));
        }
        links.add_address(ifname, &ip.address)?;
        match ip.version {
            IpFamily::V4 => gw_v4 = gw_v4.or(ip.gateway),
            IpFamily::V6 => gw_v6 = gw_v6.or(ip.gateway),
        }
    }

    for route in &result.routes {
        let fallback = match IpFamily::of(&route.dst) {
            IpFamily::V4 => gw_v4,
            IpFamily::V6 => gw_v6,
        };
        links.add_route(&RouteSpec {
            dst: route.dst,
            gw: route.gw.or(fallback),
            dev: Some(ifname.to_owned()),
        })?;
    }
    tracing::debug!(ifname, addresses = result.ips.len(), routes = result.routes.len(), "configured interface");
    Ok(())
}
