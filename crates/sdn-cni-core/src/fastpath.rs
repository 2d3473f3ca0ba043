//! Host routes for the optional fast-path (macvlan) interface.
//!
//! A macvlan device cannot reach its parent's own addresses, and traffic to
//! the service network and cluster DNS must keep going through the SDN. For
//! each such destination a route via the pod's default gateway is installed
//! in the sandbox.

use std::net::{IpAddr, Ipv4Addr};

use ipnetwork::IpNetwork;

use sdn_cni_common::constants::FAST_PATH_INTERFACE;
use sdn_cni_common::error::{CniError, Result};

use crate::link::{LinkOps, RouteSpec};
use crate::namespace::{self, NetNamespace};

/// Destinations that must stay reachable through the SDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastPathTargets {
    /// Service network CIDR.
    pub service_network: IpNetwork,
    /// Cluster DNS address.
    pub dns: IpAddr,
    /// Default gateway captured from the IPAM result.
    pub gateway: Option<Ipv4Addr>,
}

/// Computes the host routes for the given parent addresses.
///
/// One `/32` per parent address, the service network, and the DNS address,
/// in that order, each via `gateway`.
pub fn plan_host_routes(
    parent_addresses: &[Ipv4Addr],
    service_network: IpNetwork,
    dns: IpAddr,
    gateway: Ipv4Addr,
) -> Vec<RouteSpec> {
    parent_addresses
        .iter()
        .map(|addr| IpNetwork::from(IpAddr::V4(*addr)))
        .chain([service_network, IpNetwork::from(dns)])
        .map(|dst| RouteSpec {
            dst,
            gw: Some(IpAddr::V4(gateway)),
            dev: None,
        })
        .collect()
}

/// Configures the fast-path interface if the sandbox has one.
///
/// Must be called while attached to the container namespace; the parent's
/// addresses are read inside `host_ns`. Returns the number of routes
/// installed, zero when there is no fast-path interface.
///
/// # Errors
///
/// Returns an error if the interface cannot be brought up, its parent's
/// addresses cannot be listed, there is no gateway to route through, or a
/// route cannot be installed.
pub fn configure_fast_path(
    links: &dyn LinkOps,
    host_ns: &dyn NetNamespace,
    targets: &FastPathTargets,
) -> Result<usize> {
    let Some(link) = links.link_by_name(FAST_PATH_INTERFACE)? else {
        return Ok(0);
    };
    let gateway = targets.gateway.ok_or_else(|| CniError::Config {
        message: "macvlan routes need a default gateway in the IPAM result".into(),
    })?;
    links
        .set_link_up(FAST_PATH_INTERFACE)
        .map_err(|e| CniError::kernel("enable macvlan device", e))?;

    let parent = link.parent_index.ok_or_else(|| {
        CniError::kernel("configure macvlan device", "no parent link")
    })?;
    let parent_addresses = namespace::within(host_ns, || links.ipv4_addresses(parent))
        .map_err(|e| CniError::kernel("configure macvlan device", e))?;

    let routes = plan_host_routes(&parent_addresses, targets.service_network, targets.dns, gateway);
    for route in &routes {
        links
            .add_route(route)
            .map_err(|e| CniError::kernel(format!("add route to dst: {} via SDN", route.dst), e))?;
    }
    tracing::debug!(routes = routes.len(), parent, "configured fast-path routes");
    Ok(routes.len())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::{RecordingLinks, RecordingNamespace};

    const GW: Ipv4Addr = Ipv4Addr::new(10, 128, 0, 1);

    fn targets() -> FastPathTargets {
        FastPathTargets {
            service_network: "172.30.0.0/16".parse().unwrap(),
            dns: "172.30.0.10".parse().unwrap(),
            gateway: Some(GW),
        }
    }

    #[test]
    fn plans_one_route_per_destination() {
        let routes = plan_host_routes(
            &[Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 11)],
            "172.30.0.0/16".parse().unwrap(),
            "172.30.0.10".parse().unwrap(),
            GW,
        );
        let dsts: Vec<String> = routes.iter().map(|r| r.dst.to_string()).collect();
        assert_eq!(
            dsts,
            vec!["192.168.1.10/32", "192.168.1.11/32", "172.30.0.0/16", "172.30.0.10/32"]
        );
        assert!(routes.iter().all(|r| r.gw == Some(IpAddr::V4(GW))));
    }

    #[test]
    fn no_fast_path_interface_installs_nothing() {
        let links = RecordingLinks::default();
        let host = RecordingNamespace::new("host", links.log());
        let installed = configure_fast_path(&links, &host, &targets()).unwrap();
        assert_eq!(installed, 0);
        assert!(links.routes().is_empty());
    }

    #[test]
    fn parent_addresses_are_read_in_host_namespace() {
        let links = RecordingLinks::default()
            .with_macvlan(2, vec![Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 11)]);
        let host = RecordingNamespace::new("host", links.log());

        let installed = configure_fast_path(&links, &host, &targets()).unwrap();
        assert_eq!(installed, 4);

        let log = links.events();
        let enter = log.iter().position(|e| e == "enter host").unwrap();
        let list = log.iter().position(|e| e == "ipv4_addresses 2").unwrap();
        let leave = log.iter().position(|e| e == "leave host").unwrap();
        assert!(enter < list && list < leave);
        assert!(log.iter().any(|e| e == "set_link_up macvlan0"));
    }

    #[test]
    fn missing_gateway_is_rejected() {
        let links = RecordingLinks::default().with_macvlan(2, vec![]);
        let host = RecordingNamespace::new("host", links.log());
        let mut targets = targets();
        targets.gateway = None;
        let err = configure_fast_path(&links, &host, &targets).unwrap_err();
        assert!(matches!(err, CniError::Config { .. }));
        assert!(links.routes().is_empty());
        assert!(links.events().is_empty(), "macvlan0 must stay untouched");
    }
}
